//! Dense ranking of final standings.
//!
//! The authority sends final totals already sorted by points, highest first.
//! That order is trusted and never checked or re-sorted here: an unsorted list
//! produces groups in input order, one group per run of equal points.
//!
//! Ranks are dense. Every distinct score value advances the rank by exactly
//! one, so `[100, 100, 80]` yields ranks `1, 1, 2` rather than `1, 1, 3`. The
//! podium view relies on ranks 1, 2 and 3 all existing whenever there are at
//! least three distinct scores.

use serde::Serialize;

use crate::state::round::FinalScore;

/// Number of ranks shown individually on the podium.
pub const PODIUM_RANKS: usize = 3;

/// Participants sharing one rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankGroup {
    /// Dense rank, starting at 1.
    pub rank: usize,
    /// Points shared by every entry of the group.
    pub points: u64,
    /// Entries in input order.
    pub entries: Vec<FinalScore>,
}

/// Group score-sorted entries into dense rank groups.
pub fn group_by_rank(scores: &[FinalScore]) -> Vec<RankGroup> {
    let mut groups: Vec<RankGroup> = Vec::new();

    for score in scores {
        let rank = match groups.last_mut() {
            Some(open) if open.points == score.points => {
                open.entries.push(score.clone());
                continue;
            }
            Some(open) => open.rank + 1,
            None => 1,
        };

        groups.push(RankGroup {
            rank,
            points: score.points,
            entries: vec![score.clone()],
        });
    }

    groups
}

/// One entry below the podium, still carrying its dense rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    /// Dense rank of the entry.
    pub rank: usize,
    /// Display name.
    pub name: String,
    /// Total points.
    pub points: u64,
}

/// Final leaderboard split into podium groups and the flat remainder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Standings {
    /// Groups ranked 1 to [`PODIUM_RANKS`].
    pub podium: Vec<RankGroup>,
    /// Everyone ranked below the podium, in order.
    pub remaining: Vec<RankedEntry>,
}

impl Standings {
    /// Rank `scores` and split the result for display.
    pub fn from_scores(scores: &[FinalScore]) -> Self {
        Self::from_groups(group_by_rank(scores))
    }

    /// Split already computed groups for display.
    pub fn from_groups(groups: Vec<RankGroup>) -> Self {
        let (podium, rest): (Vec<_>, Vec<_>) = groups
            .into_iter()
            .partition(|group| group.rank <= PODIUM_RANKS);

        let remaining = rest
            .into_iter()
            .flat_map(|group| {
                let rank = group.rank;
                group.entries.into_iter().map(move |entry| RankedEntry {
                    rank,
                    name: entry.name,
                    points: entry.points,
                })
            })
            .collect();

        Self { podium, remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(list: &[(&str, u64)]) -> Vec<FinalScore> {
        list.iter()
            .map(|(name, points)| FinalScore {
                name: (*name).into(),
                points: *points,
            })
            .collect()
    }

    fn names(group: &RankGroup) -> Vec<&str> {
        group.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[test]
    fn ties_share_a_dense_rank() {
        let groups = group_by_rank(&scores(&[
            ("A", 100),
            ("B", 100),
            ("C", 80),
            ("D", 80),
            ("E", 50),
        ]));

        assert_eq!(groups.len(), 3);
        assert_eq!((groups[0].rank, names(&groups[0])), (1, vec!["A", "B"]));
        assert_eq!((groups[1].rank, names(&groups[1])), (2, vec!["C", "D"]));
        assert_eq!((groups[2].rank, names(&groups[2])), (3, vec!["E"]));
    }

    #[test]
    fn single_entry_is_first() {
        let groups = group_by_rank(&scores(&[("A", 50)]));
        assert_eq!(groups.len(), 1);
        assert_eq!((groups[0].rank, names(&groups[0])), (1, vec!["A"]));
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_rank(&[]).is_empty());
    }

    #[test]
    fn regrouping_flattened_output_is_stable() {
        let input = scores(&[("A", 9), ("B", 7), ("C", 7), ("D", 3), ("E", 3), ("F", 1)]);
        let first = group_by_rank(&input);
        let flattened: Vec<FinalScore> = first
            .iter()
            .flat_map(|group| group.entries.iter().cloned())
            .collect();

        assert_eq!(flattened, input);
        assert_eq!(group_by_rank(&flattened), first);
    }

    #[test]
    fn unsorted_input_is_grouped_as_given() {
        let groups = group_by_rank(&scores(&[("A", 10), ("B", 20), ("C", 10)]));
        let ranks: Vec<usize> = groups.iter().map(|group| group.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn standings_split_podium_from_remainder() {
        let standings = Standings::from_scores(&scores(&[
            ("A", 40),
            ("B", 30),
            ("C", 30),
            ("D", 20),
            ("E", 10),
            ("F", 10),
        ]));

        let podium_ranks: Vec<usize> = standings.podium.iter().map(|group| group.rank).collect();
        assert_eq!(podium_ranks, vec![1, 2, 3]);
        assert_eq!(
            standings.remaining,
            vec![
                RankedEntry {
                    rank: 4,
                    name: "E".into(),
                    points: 10,
                },
                RankedEntry {
                    rank: 4,
                    name: "F".into(),
                    points: 10,
                },
            ]
        );
    }
}
