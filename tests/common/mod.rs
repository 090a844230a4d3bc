//! Shared fixtures for integration tests.

#![allow(dead_code)]

use serde_json::json;
use timetable_search::SchoolConfig;
use timetable_search::rules::Rule;

/// Six teachers, eight subjects, nine periods, nine rooms.
pub fn worked_example() -> SchoolConfig {
    serde_json::from_value(json!({
        "teachers": [
            {"name": "Alice", "subjects": ["Math"], "maxHours": 10},
            {"name": "Bob", "subjects": ["Physics"], "maxHours": 10},
            {"name": "Cindy", "subjects": ["Biology", "Chemistry"], "maxHours": 10},
            {"name": "Dave", "subjects": ["English"], "maxHours": 10},
            {"name": "Ella", "subjects": ["History", "Geography"], "maxHours": 10},
            {"name": "Frank", "subjects": ["Computer Science"], "maxHours": 10}
        ],
        "subjects": [
            {"name": "Math", "minHours": 2},
            {"name": "Physics", "minHours": 2},
            {"name": "Biology", "minHours": 2},
            {"name": "Chemistry", "minHours": 2},
            {"name": "English", "minHours": 2},
            {"name": "History", "minHours": 2},
            {"name": "Geography", "minHours": 3},
            {"name": "Computer Science", "minHours": 3}
        ],
        "rooms": ["101", "102", "103", "104", "105", "106", "107", "108", "109"],
        "periodsPerDay": 9
    }))
    .expect("worked example deserializes")
}

/// A single teacher covering `subjects` generic subjects with no minimums.
pub fn small(subjects: usize, periods: u32) -> SchoolConfig {
    let names: Vec<String> = (0..subjects).map(|i| format!("S{i}")).collect();
    let subject_list: Vec<_> = names
        .iter()
        .map(|n| json!({"name": n, "minHours": 0}))
        .collect();
    serde_json::from_value(json!({
        "teachers": [{"name": "T", "subjects": names, "maxHours": 1000}],
        "subjects": subject_list,
        "rooms": ["101"],
        "periodsPerDay": periods
    }))
    .expect("small config deserializes")
}

/// The four free-text constraints of the worked example.
pub fn sample_constraints() -> Vec<String> {
    [
        "Chemistry must always be taught in the second half of the day (periods 5-9).",
        "Math must be taught in the last period everyday.",
        "Computer science should be taught right before math ONLY on Tuesday. The rest of the days should be different",
        "Physics should be the second to last period everyday except Tuesday.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Rules a synthesis service would return for [`sample_constraints`].
pub fn sample_rules() -> Vec<Rule> {
    serde_json::from_value(json!([
        {"kind": "subjectWithinPeriods", "subject": "Chemistry", "from": 5, "to": 9},
        {"kind": "subjectAtPeriod", "subject": "Math", "period": {"fromEnd": 0}},
        {"kind": "allOf", "rules": [
            {"kind": "subjectBefore", "first": "Computer Science", "second": "Math", "days": {"only": ["Tuesday"]}},
            {"kind": "notSubjectBefore", "first": "Computer Science", "second": "Math", "days": {"except": ["Tuesday"]}}
        ]},
        {"kind": "subjectAtPeriod", "subject": "Physics", "period": {"fromEnd": 1}, "days": {"except": ["Tuesday"]}}
    ]))
    .expect("sample rules deserialize")
}
