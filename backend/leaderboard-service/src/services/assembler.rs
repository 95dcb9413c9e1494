use crate::models::{Category, Entity, LeaderboardRow};

/// Rank `entities` by `primary` then `secondary`, both descending.
///
/// The sort is stable, so full ties keep input order. Entities scoring zero
/// on both keys carry no data for the category and are left out.
pub fn rank<P, S>(
    entities: &[Entity],
    primary: P,
    secondary: S,
    limit: usize,
) -> Vec<LeaderboardRow>
where
    P: Fn(&Entity) -> i64,
    S: Fn(&Entity) -> i64,
{
    let mut scored: Vec<(i64, i64, &Entity)> = entities
        .iter()
        .map(|entity| (primary(entity), secondary(entity), entity))
        .filter(|(p, s, _)| *p != 0 || *s != 0)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, (primary, secondary, entity))| LeaderboardRow {
            rank: index + 1,
            name: entity.display_name.clone(),
            primary,
            secondary,
        })
        .collect()
}

/// Turns a category's qualifying entities into display rows
#[derive(Debug, Clone)]
pub struct LeaderboardAssembler {
    display_size: usize,
}

impl LeaderboardAssembler {
    pub fn new(display_size: usize) -> Self {
        Self { display_size }
    }

    pub fn assemble(&self, entities: &[Entity], category: &Category) -> Vec<LeaderboardRow> {
        rank(
            entities,
            |e| category.primary(e),
            |e| category.secondary(e),
            self.display_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, level: i64, xp: i64) -> Entity {
        Entity::new(name).with_skill("attack", level, xp)
    }

    fn names(rows: &[LeaderboardRow]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_ties_keep_input_order() {
        let entities = vec![entity("A", 10, 5), entity("B", 10, 5), entity("C", 9, 9)];
        let rows = LeaderboardAssembler::new(10).assemble(&entities, &Category::skill("attack"));

        assert_eq!(names(&rows), vec!["A", "B", "C"]);
        assert_eq!(
            rows.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_secondary_breaks_primary_ties() {
        let entities = vec![entity("low", 50, 100), entity("high", 50, 900), entity("top", 60, 0)];
        let rows = rank(
            &entities,
            |e| e.skill("attack").unwrap().level,
            |e| e.skill("attack").unwrap().experience,
            10,
        );
        assert_eq!(names(&rows), vec!["top", "high", "low"]);
    }

    #[test]
    fn test_zero_rows_excluded_and_truncated() {
        let entities = vec![
            entity("a", 0, 0),
            entity("b", 3, 0),
            entity("c", 0, 7),
            entity("d", 5, 5),
            Entity::new("no-data"),
        ];
        let rows = LeaderboardAssembler::new(2).assemble(&entities, &Category::skill("attack"));
        assert_eq!(names(&rows), vec!["d", "b"]);
    }

    #[test]
    fn test_empty_input() {
        let rows = LeaderboardAssembler::new(10).assemble(&[], &Category::counter("zulrah"));
        assert!(rows.is_empty());
    }

    #[test]
    fn test_rank_is_idempotent() {
        let entities = vec![
            entity("q", 7, 1),
            entity("r", 7, 1),
            entity("s", 9, 0),
            entity("t", 1, 99),
        ];
        let category = Category::skill("attack");
        let assembler = LeaderboardAssembler::new(10);
        assert_eq!(
            assembler.assemble(&entities, &category),
            assembler.assemble(&entities, &category)
        );
    }
}
