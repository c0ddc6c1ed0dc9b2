//! Run-length grouping of consecutive items sharing a key.
//!
//! Items are fed in file order. A group is closed whenever the key changes,
//! so a key that reappears later starts a new group instead of extending
//! the earlier one.

#[derive(Debug, Clone, PartialEq)]
pub enum GroupState<K, T> {
    Empty,
    Accumulating { key: K, members: Vec<T> },
}

/// A group that was closed by a key change or by [`RunGrouper::finish`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedGroup<K, T> {
    pub key: K,
    pub members: Vec<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunGrouper<K, T> {
    state: GroupState<K, T>,
}

impl<K, T> Default for RunGrouper<K, T> {
    fn default() -> Self {
        Self {
            state: GroupState::Empty,
        }
    }
}

impl<K: PartialEq, T> RunGrouper<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GroupState<K, T> {
        &self.state
    }

    /// Feeds the next item; returns the group it closed, if any
    pub fn push(&mut self, key: K, item: T) -> Option<ClosedGroup<K, T>> {
        let state = std::mem::replace(&mut self.state, GroupState::Empty);
        let (state, closed) = Self::transition(state, key, item);
        self.state = state;
        closed
    }

    /// Closes the group in progress
    pub fn finish(self) -> Option<ClosedGroup<K, T>> {
        match self.state {
            GroupState::Empty => None,
            GroupState::Accumulating { key, members } => Some(ClosedGroup { key, members }),
        }
    }

    fn transition(
        state: GroupState<K, T>,
        key: K,
        item: T,
    ) -> (GroupState<K, T>, Option<ClosedGroup<K, T>>) {
        match state {
            GroupState::Empty => (
                GroupState::Accumulating {
                    key,
                    members: vec![item],
                },
                None,
            ),
            GroupState::Accumulating {
                key: current,
                mut members,
            } if current == key => {
                members.push(item);
                (
                    GroupState::Accumulating {
                        key: current,
                        members,
                    },
                    None,
                )
            }
            GroupState::Accumulating {
                key: current,
                members,
            } => (
                GroupState::Accumulating {
                    key,
                    members: vec![item],
                },
                Some(ClosedGroup {
                    key: current,
                    members,
                }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_all<K: PartialEq + Copy, T>(items: Vec<(K, T)>) -> Vec<ClosedGroup<K, T>> {
        let mut grouper = RunGrouper::new();
        let mut groups: Vec<_> = items
            .into_iter()
            .filter_map(|(key, item)| grouper.push(key, item))
            .collect();
        groups.extend(grouper.finish());
        groups
    }

    #[test]
    fn test_empty_grouper_yields_nothing() {
        let grouper = RunGrouper::<char, usize>::new();
        assert_eq!(grouper.state(), &GroupState::Empty);
        assert_eq!(grouper.finish(), None);
    }

    #[test]
    fn test_first_item_starts_accumulating() {
        let mut grouper = RunGrouper::new();
        assert_eq!(grouper.push('A', 1), None);
        assert_eq!(
            grouper.state(),
            &GroupState::Accumulating {
                key: 'A',
                members: vec![1]
            }
        );
    }

    #[test]
    fn test_key_change_closes_group() {
        let mut grouper = RunGrouper::new();
        grouper.push('A', 1);
        grouper.push('A', 2);
        let closed = grouper.push('B', 3);

        assert_eq!(
            closed,
            Some(ClosedGroup {
                key: 'A',
                members: vec![1, 2]
            })
        );
        assert_eq!(
            grouper.state(),
            &GroupState::Accumulating {
                key: 'B',
                members: vec![3]
            }
        );
    }

    #[test]
    fn test_repeated_key_is_not_merged() {
        let groups = group_all(vec![('A', 0), ('A', 1), ('B', 2), ('B', 3), ('A', 4)]);

        let summary: Vec<_> = groups.iter().map(|g| (g.key, g.members.clone())).collect();
        assert_eq!(
            summary,
            vec![('A', vec![0, 1]), ('B', vec![2, 3]), ('A', vec![4])]
        );
    }

    #[test]
    fn test_unit_key_collects_everything() {
        let groups = group_all((0..5).map(|i| ((), i)).collect());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![0, 1, 2, 3, 4]);
    }
}
