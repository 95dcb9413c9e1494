//! Raw payload -> [`Entity`] normalization
//!
//! The upstream has shipped several payload shapes over time (flat member
//! records, snapshot-wrapped player details, hiscores entries). All
//! missing-field handling lives here; the rest of the crate only sees
//! `Entity` with explicit optional categories.
//!
//! Accepted player shapes:
//! - `{ username, displayName, latestSnapshot: { data: { skills, bosses, activities } } }`
//! - `{ username, skills: { attack: { level, xp } }, bosses: { zulrah: 5 }, totalLevel, totalXp }`

use crate::models::{Category, CategoryKind, Entity};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Normalize a player details payload. `None` when the payload has no identity.
pub fn normalize_player(raw: &Value) -> Option<Entity> {
    let mut entity = identity(raw)?;

    let data = raw
        .pointer("/latestSnapshot/data")
        .filter(|v| v.is_object())
        .unwrap_or(raw);

    if let Some(skills) = data.get("skills").and_then(Value::as_object) {
        for (name, stat) in skills {
            if let Some((level, experience)) = skill_values(stat) {
                entity = entity.with_skill(name, level, experience);
            }
        }
    }

    for section in ["bosses", "activities", "computed"] {
        if let Some(counters) = data.get(section).and_then(Value::as_object) {
            for (name, value) in counters {
                if let Some(count) = counter_value(value) {
                    entity = entity.with_counter(name, count);
                }
            }
        }
    }

    if entity.skill("overall").is_none() {
        if let Some(level) = int(raw.get("totalLevel")) {
            let experience = int(raw.get("totalXp")).unwrap_or(0);
            entity = entity.with_skill("overall", level, experience);
        }
    }

    Some(entity)
}

/// Normalize a group hiscores payload for `category`, preserving upstream
/// order. Each entity carries only that category. Duplicate players keep
/// their first position. `None` when the payload is not a list.
pub fn normalize_hiscores(raw: &Value, category: &Category) -> Option<Vec<Entity>> {
    let entries = raw.as_array()?;
    let mut seen = HashSet::new();
    let mut candidates = Vec::with_capacity(entries.len());

    for entry in entries {
        let player = entry.get("player").unwrap_or(entry);
        let Some(mut entity) = identity(player) else {
            debug!(category = %category.name, "Skipping hiscores entry without identity");
            continue;
        };
        if !seen.insert(entity.id.clone()) {
            continue;
        }

        let data = entry.get("data").unwrap_or(entry);
        match category.kind {
            CategoryKind::Skill => {
                if let Some((level, experience)) = skill_values(data) {
                    entity = entity.with_skill(&category.name, level, experience);
                }
            }
            CategoryKind::Counter => {
                if let Some(count) = counter_value(data) {
                    entity = entity.with_counter(&category.name, count);
                }
            }
        }
        candidates.push(entity);
    }

    Some(candidates)
}

fn identity(raw: &Value) -> Option<Entity> {
    let obj: &Map<String, Value> = raw.as_object()?;
    let username = text(obj.get("username"));
    let display = text(obj.get("displayName"));

    let mut entity = Entity::new(username.or(display)?);
    if let Some(display) = display {
        entity.display_name = display.trim().to_string();
    }
    Some(entity)
}

/// `(level, experience)`; experience may be spelled `xp`. Needs a level.
fn skill_values(raw: &Value) -> Option<(i64, i64)> {
    let level = int(raw.get("level"))?;
    let experience = int(raw.get("experience").or_else(|| raw.get("xp"))).unwrap_or(0);
    Some((level.max(0), experience.max(0)))
}

/// Bare numbers, or objects with `kills`, `score` or `value`.
/// Unranked counters (-1 upstream) become 0.
fn counter_value(raw: &Value) -> Option<i64> {
    let count = match raw {
        Value::Number(_) => int(Some(raw)),
        Value::Object(obj) => int(obj.get("kills"))
            .or_else(|| int(obj.get("score")))
            .or_else(|| int(obj.get("value"))),
        _ => None,
    }?;
    Some(count.max(0))
}

fn int(raw: Option<&Value>) -> Option<i64> {
    let raw = raw?;
    raw.as_i64().or_else(|| raw.as_f64().map(|f| f as i64))
}

fn text(raw: Option<&Value>) -> Option<&str> {
    raw.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_shape() {
        let raw = json!({
            "username": "lil bob",
            "displayName": "Lil Bob",
            "latestSnapshot": { "data": {
                "skills": {
                    "overall": { "metric": "overall", "level": 500, "experience": 1_000_000 },
                    "attack": { "metric": "attack", "level": 1, "experience": 0 }
                },
                "bosses": {
                    "zulrah": { "metric": "zulrah", "kills": -1 },
                    "vorkath": { "kills": 12 }
                },
                "activities": { "clue_scrolls_all": { "score": 7 } }
            }}
        });

        let entity = normalize_player(&raw).unwrap();
        assert_eq!(entity.id, "lil bob");
        assert_eq!(entity.display_name, "Lil Bob");
        assert_eq!(entity.skill("overall").unwrap().experience, 1_000_000);
        assert_eq!(entity.skill("attack").unwrap().level, 1);
        assert_eq!(entity.counter("zulrah"), Some(0));
        assert_eq!(entity.counter("vorkath"), Some(12));
        assert_eq!(entity.counter("clue_scrolls_all"), Some(7));
    }

    #[test]
    fn test_flat_member_shape() {
        let raw = json!({
            "username": "Pure",
            "skills": { "strength": { "level": 99, "xp": 13_034_431 } },
            "bosses": { "obor": 40 },
            "totalLevel": 400,
            "totalXp": 20_000_000
        });

        let entity = normalize_player(&raw).unwrap();
        assert_eq!(entity.skill("strength").unwrap().experience, 13_034_431);
        assert_eq!(entity.counter("obor"), Some(40));
        assert_eq!(entity.skill("overall").unwrap().level, 400);
    }

    #[test]
    fn test_missing_fields_are_absent_not_zero() {
        let raw = json!({ "username": "x", "skills": { "attack": { "experience": 10 } } });
        let entity = normalize_player(&raw).unwrap();
        assert!(entity.skill("attack").is_none());
        assert!(entity.skill("strength").is_none());
    }

    #[test]
    fn test_no_identity() {
        assert!(normalize_player(&json!({ "skills": {} })).is_none());
        assert!(normalize_player(&json!([1, 2])).is_none());
        assert!(normalize_player(&json!({ "username": "  " })).is_none());
    }

    #[test]
    fn test_hiscores_order_and_dedupe() {
        let raw = json!([
            {
                "player": { "username": "a", "displayName": "A" },
                "data": { "type": "skill", "level": 99, "experience": 200 }
            },
            {
                "player": { "displayName": "B" },
                "data": { "type": "skill", "level": 90, "experience": 100 }
            },
            { "player": { "username": "a" }, "data": { "level": 1, "experience": 1 } },
            { "data": { "level": 5 } },
            { "player": { "username": "c" }, "data": { "type": "skill" } }
        ]);

        let entities = normalize_hiscores(&raw, &Category::skill("attack")).unwrap();
        let ids: Vec<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(entities[0].skill("attack").unwrap().level, 99);
        assert!(entities[2].skill("attack").is_none());
    }

    #[test]
    fn test_hiscores_counter_and_bad_shape() {
        let raw = json!([
            { "player": { "username": "k" }, "data": { "type": "boss", "kills": 300 } }
        ]);
        let entities = normalize_hiscores(&raw, &Category::counter("zulrah")).unwrap();
        assert_eq!(entities[0].counter("zulrah"), Some(300));

        let not_a_list = json!({ "error": "oops" });
        assert!(normalize_hiscores(&not_a_list, &Category::counter("zulrah")).is_none());
    }
}
