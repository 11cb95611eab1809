//! Level-synchronous breadth-first search over an abstract puzzle.
//!
//! The engine knows nothing about terrains or blocks. It consumes a
//! [`Puzzle`] (start state, goal predicate, legal neighbors) and produces a
//! lazy stream of [`Path`]s in ascending history length. Each level is fully
//! added to the explored set before the next level is expanded, so the
//! first path that satisfies the goal is a shortest one.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::debug;

/// The capabilities the search engine needs from a game definition.
pub trait Puzzle {
    /// A placement of the movable entity. Compared and hashed to detect revisits.
    type State: Clone + Eq + Hash;
    /// A single atomic action.
    type Move: Clone;
    /// The legal `(neighbor, move)` pairs of a state.
    type Neighbors: IntoIterator<Item = (Self::State, Self::Move)>;

    fn start(&self) -> Self::State;

    fn is_goal(&self, state: &Self::State) -> bool;

    /// Every state reachable in one legal move, paired with the move that
    /// produces it. The order of the pairs fixes the order within a level.
    fn legal_neighbors(&self, state: &Self::State) -> Self::Neighbors;
}

struct Node<M> {
    mv: M,
    tail: Option<Rc<Node<M>>>,
}

/// Moves taken to reach a state, most recent first.
///
/// Histories share their tails, so extending one for every neighbor of a
/// state costs one allocation per neighbor regardless of path length.
pub struct History<M> {
    head: Option<Rc<Node<M>>>,
    len: usize,
}

impl<M> History<M> {
    /// An empty history (the start state).
    pub fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Number of moves in the history.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A new history with `mv` as its most recent move.
    pub fn push(&self, mv: M) -> Self {
        Self {
            head: Some(Rc::new(Node {
                mv,
                tail: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// The most recent move, if any.
    pub fn latest(&self) -> Option<&M> {
        self.head.as_ref().map(|node| &node.mv)
    }

    /// Iterate from the most recent move back to the first one.
    pub fn iter(&self) -> HistoryIter<'_, M> {
        HistoryIter {
            next: self.head.as_deref(),
        }
    }

    /// The moves in execution order (first move first).
    pub fn to_forward(&self) -> Vec<M>
    where
        M: Clone,
    {
        let mut moves: Vec<M> = self.iter().cloned().collect();
        moves.reverse();
        moves
    }
}

impl<M> Default for History<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for History<M> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<M: PartialEq> PartialEq for History<M> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<M: Eq> Eq for History<M> {}

impl<M: fmt::Debug> fmt::Debug for History<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<M> Drop for History<M> {
    // Unlink iteratively; a recursive drop of a long unshared chain would
    // overflow the stack.
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.tail.take(),
                Err(_) => break,
            }
        }
    }
}

pub struct HistoryIter<'a, M> {
    next: Option<&'a Node<M>>,
}

impl<'a, M> Iterator for HistoryIter<'a, M> {
    type Item = &'a M;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|node| {
            self.next = node.tail.as_deref();
            &node.mv
        })
    }
}

impl<'a, M> IntoIterator for &'a History<M> {
    type Item = &'a M;
    type IntoIter = HistoryIter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A state together with the history that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path<S, M> {
    pub state: S,
    pub history: History<M>,
}

impl<S, M> Path<S, M> {
    pub fn new(state: S, history: History<M>) -> Self {
        Self { state, history }
    }

    /// Number of moves from the start.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Expand `state` into one path per legal move, each history extended by the
/// move that produced the neighbor. No revisit filtering happens here.
pub fn neighbors_with_history<P: Puzzle>(
    puzzle: &P,
    state: &P::State,
    history: History<P::Move>,
) -> impl Iterator<Item = Path<P::State, P::Move>> {
    puzzle
        .legal_neighbors(state)
        .into_iter()
        .map(move |(next, mv)| Path::new(next, history.push(mv)))
}

/// Keep the paths whose state is not in `explored`, preserving their order.
pub fn new_neighbors_only<'a, S, M, I>(
    neighbors: I,
    explored: &'a HashSet<S>,
) -> impl Iterator<Item = Path<S, M>> + 'a
where
    S: Eq + Hash + 'a,
    M: 'a,
    I: IntoIterator<Item = Path<S, M>>,
    I::IntoIter: 'a,
{
    neighbors
        .into_iter()
        .filter(move |path| !explored.contains(&path.state))
}

/// Lazy level-ordered stream of every path reachable from an initial level.
///
/// The current level is held in full; the next one is computed only once
/// the consumer has pulled every path of the current level. Dropping the
/// iterator stops the search.
pub struct Frontier<'p, P: Puzzle> {
    puzzle: &'p P,
    level: Vec<Path<P::State, P::Move>>,
    cursor: usize,
    explored: HashSet<P::State>,
    levels_expanded: usize,
}

impl<'p, P: Puzzle> Frontier<'p, P> {
    /// Continue a search from `initial`, given the states explored by every
    /// level before it.
    ///
    /// The initial states are added to `explored` before anything is
    /// expanded. A path whose state is already explored, or repeats an
    /// earlier path of the same level, is dropped.
    pub fn from_level(
        puzzle: &'p P,
        mut initial: Vec<Path<P::State, P::Move>>,
        mut explored: HashSet<P::State>,
    ) -> Self {
        initial.retain(|path| explored.insert(path.state.clone()));
        Self {
            puzzle,
            level: initial,
            cursor: 0,
            explored,
            levels_expanded: 0,
        }
    }

    /// States yielded so far or already scheduled in the current level.
    pub fn explored(&self) -> &HashSet<P::State> {
        &self.explored
    }

    /// Number of levels computed after the initial one.
    pub fn levels_expanded(&self) -> usize {
        self.levels_expanded
    }

    /// Replace the exhausted current level by the next one.
    ///
    /// Every state of the current level is already in `explored`; fresh
    /// states are inserted as they are found so that two parents of the same
    /// neighbor cannot both schedule it.
    fn advance(&mut self) {
        let mut next = Vec::new();
        for path in &self.level {
            let candidates =
                neighbors_with_history(self.puzzle, &path.state, path.history.clone());
            let fresh: SmallVec<[Path<P::State, P::Move>; 4]> =
                new_neighbors_only(candidates, &self.explored).collect();
            for candidate in fresh {
                if self.explored.insert(candidate.state.clone()) {
                    next.push(candidate);
                }
            }
        }

        self.levels_expanded += 1;
        debug!(
            level = self.levels_expanded,
            level_size = next.len(),
            explored = self.explored.len(),
            "frontier level expanded"
        );

        self.level = next;
        self.cursor = 0;
    }
}

impl<'p, P: Puzzle> Iterator for Frontier<'p, P> {
    type Item = Path<P::State, P::Move>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == self.level.len() {
            if self.level.is_empty() {
                return None;
            }
            self.advance();
            if self.level.is_empty() {
                return None;
            }
        }
        let path = self.level[self.cursor].clone();
        self.cursor += 1;
        Some(path)
    }
}

/// Every path reachable from the start, shortest first, each state once.
pub fn paths_from_start<P: Puzzle>(puzzle: &P) -> Frontier<'_, P> {
    let start = Path::new(puzzle.start(), History::new());
    Frontier::from_level(puzzle, vec![start], HashSet::new())
}

/// The paths of [`paths_from_start`] that end in a goal state.
pub fn paths_to_goal<'p, P: Puzzle>(
    puzzle: &'p P,
) -> impl Iterator<Item = Path<P::State, P::Move>> + 'p {
    paths_from_start(puzzle).filter(move |path| puzzle.is_goal(&path.state))
}

/// A shortest move sequence from the start to a goal, in execution order.
///
/// Empty when the start is already a goal or when no goal is reachable.
pub fn solution<P: Puzzle>(puzzle: &P) -> Vec<P::Move> {
    paths_to_goal(puzzle)
        .next()
        .map(|path| path.history.to_forward())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Step {
        Inc,
        Dec,
        Double,
    }

    /// Integers in `0..=limit`, moving by +1, -1 or *2.
    struct NumberLine {
        start: u32,
        goal: u32,
        limit: u32,
        expansions: Cell<usize>,
    }

    impl NumberLine {
        fn new(start: u32, goal: u32, limit: u32) -> Self {
            Self {
                start,
                goal,
                limit,
                expansions: Cell::new(0),
            }
        }

        fn apply(&self, n: u32, step: Step) -> Option<u32> {
            let next = match step {
                Step::Inc => n.checked_add(1)?,
                Step::Dec => n.checked_sub(1)?,
                Step::Double => n.checked_mul(2)?,
            };
            (next <= self.limit).then_some(next)
        }
    }

    impl Puzzle for NumberLine {
        type State = u32;
        type Move = Step;
        type Neighbors = Vec<(u32, Step)>;

        fn start(&self) -> u32 {
            self.start
        }

        fn is_goal(&self, state: &u32) -> bool {
            *state == self.goal
        }

        fn legal_neighbors(&self, state: &u32) -> Vec<(u32, Step)> {
            self.expansions.set(self.expansions.get() + 1);
            [Step::Inc, Step::Dec, Step::Double]
                .into_iter()
                .filter_map(|step| self.apply(*state, step).map(|n| (n, step)))
                .collect()
        }
    }

    /// An unbounded 2D lattice; never exhausts.
    struct Lattice;

    impl Puzzle for Lattice {
        type State = (i64, i64);
        type Move = char;
        type Neighbors = [((i64, i64), char); 4];

        fn start(&self) -> (i64, i64) {
            (0, 0)
        }

        fn is_goal(&self, state: &(i64, i64)) -> bool {
            *state == (3, -2)
        }

        fn legal_neighbors(&self, &(x, y): &(i64, i64)) -> Self::Neighbors {
            [
                ((x - 1, y), 'L'),
                ((x + 1, y), 'R'),
                ((x, y - 1), 'U'),
                ((x, y + 1), 'D'),
            ]
        }
    }

    fn replay(puzzle: &NumberLine, moves: &[Step]) -> Option<u32> {
        moves
            .iter()
            .try_fold(puzzle.start, |n, &step| puzzle.apply(n, step))
    }

    /// Shortest distance to every reachable state by exhaustive enumeration
    /// of move sequences up to `depth`.
    fn brute_force_distances(puzzle: &NumberLine, depth: usize) -> HashMap<u32, usize> {
        let mut distances = HashMap::new();
        let mut sequences: Vec<Vec<Step>> = vec![vec![]];
        for len in 0..=depth {
            for seq in &sequences {
                if let Some(n) = replay(puzzle, seq) {
                    distances.entry(n).or_insert(len);
                }
            }
            sequences = sequences
                .iter()
                .flat_map(|seq| {
                    [Step::Inc, Step::Dec, Step::Double].into_iter().map(move |s| {
                        let mut next = seq.clone();
                        next.push(s);
                        next
                    })
                })
                .collect();
        }
        distances
    }

    #[test]
    fn test_history_push_shares_tail() {
        let base = History::new().push(Step::Inc).push(Step::Double);
        let left = base.push(Step::Dec);
        let right = base.push(Step::Inc);

        assert_eq!(base.len(), 2);
        assert_eq!(left.len(), 3);
        assert_eq!(left.latest(), Some(&Step::Dec));
        assert_eq!(right.latest(), Some(&Step::Inc));
        assert_eq!(
            left.iter().copied().collect::<Vec<_>>(),
            vec![Step::Dec, Step::Double, Step::Inc]
        );
        assert_eq!(left.to_forward(), vec![Step::Inc, Step::Double, Step::Dec]);
    }

    #[test]
    fn test_long_history_drops_without_overflow() {
        let mut history = History::new();
        for _ in 0..200_000 {
            history = history.push(Step::Inc);
        }
        assert_eq!(history.len(), 200_000);
        drop(history);
    }

    #[test]
    fn test_neighbors_with_history_pairs_moves_with_states() {
        let puzzle = NumberLine::new(0, 9, 10);
        let history = History::new().push(Step::Inc);
        let paths: Vec<_> = neighbors_with_history(&puzzle, &3, history).collect();

        assert_eq!(paths.len(), 3);
        for path in &paths {
            let mv = *path.history.latest().unwrap();
            assert_eq!(puzzle.apply(3, mv), Some(path.state));
            assert_eq!(path.history.len(), 2);
            assert_eq!(path.history.iter().nth(1), Some(&Step::Inc));
        }
        assert_eq!(
            paths.iter().map(|p| p.state).collect::<Vec<_>>(),
            vec![4, 2, 6]
        );
    }

    #[test]
    fn test_neighbors_with_history_only_legal_moves() {
        let puzzle = NumberLine::new(0, 9, 10);
        let paths: Vec<_> = neighbors_with_history(&puzzle, &0, History::new()).collect();
        // 0 - 1 underflows; 0 * 2 stays at 0
        assert_eq!(
            paths.iter().map(|p| p.state).collect::<Vec<_>>(),
            vec![1, 0]
        );
    }

    #[test]
    fn test_new_neighbors_only_is_stable_filter() {
        let explored: HashSet<u32> = [2, 5].into_iter().collect();
        let h = History::<Step>::new();
        let input = vec![
            Path::new(7, h.push(Step::Inc)),
            Path::new(2, h.push(Step::Dec)),
            Path::new(1, h.push(Step::Double)),
            Path::new(5, h.push(Step::Inc)),
            Path::new(3, h.push(Step::Dec)),
        ];

        let kept: Vec<_> = new_neighbors_only(input, &explored).collect();
        assert_eq!(
            kept.iter().map(|p| p.state).collect::<Vec<_>>(),
            vec![7, 1, 3]
        );
        assert_eq!(kept[1].history.latest(), Some(&Step::Double));
        assert_eq!(explored.len(), 2);
    }

    #[test]
    fn test_from_empty_level_is_empty() {
        let puzzle = NumberLine::new(0, 9, 10);
        let mut frontier = Frontier::from_level(&puzzle, Vec::new(), HashSet::new());
        assert!(frontier.next().is_none());
        assert!(frontier.next().is_none());
        assert_eq!(puzzle.expansions.get(), 0);
    }

    #[test]
    fn test_from_level_skips_explored_states() {
        let puzzle = NumberLine::new(0, 9, 4);
        let explored: HashSet<u32> = [0, 1, 2].into_iter().collect();
        let initial = vec![Path::new(2, History::new()), Path::new(3, History::new())];
        let states: Vec<u32> = Frontier::from_level(&puzzle, initial, explored)
            .map(|p| p.state)
            .collect();
        assert_eq!(states, vec![3, 4]);
    }

    #[test]
    fn test_paths_from_start_ascending_and_unique() {
        let puzzle = NumberLine::new(1, 0, 40);
        let paths: Vec<_> = paths_from_start(&puzzle).collect();

        assert_eq!(paths.len(), 41);
        assert!(paths.windows(2).all(|w| w[0].len() <= w[1].len()));

        let unique: HashSet<u32> = paths.iter().map(|p| p.state).collect();
        assert_eq!(unique.len(), paths.len());
    }

    #[test]
    fn test_paths_from_start_lengths_are_shortest() {
        let puzzle = NumberLine::new(1, 0, 20);
        let expected = brute_force_distances(&puzzle, 6);
        for path in paths_from_start(&puzzle).take_while(|p| p.len() <= 6) {
            assert_eq!(expected.get(&path.state), Some(&path.len()));
            assert_eq!(replay(&puzzle, &path.history.to_forward()), Some(path.state));
        }
    }

    #[test]
    fn test_sibling_duplicates_suppressed() {
        // Level one is [4, 2, 6]; both 4 (Inc) and 6 (Dec) reach 5.
        let puzzle = NumberLine::new(3, 0, 20);
        let level_two: Vec<_> = paths_from_start(&puzzle)
            .filter(|p| p.len() == 2)
            .collect();

        assert_eq!(
            level_two.iter().map(|p| p.state).collect::<Vec<_>>(),
            vec![5, 8, 1, 7, 12]
        );
        assert_eq!(level_two[0].history.to_forward(), vec![Step::Inc, Step::Inc]);
    }

    #[test]
    fn test_frontier_counts_levels_and_explored() {
        // Level one from 3 is [4, 2, 6]; level two is [5, 8, 1, 7, 12].
        let puzzle = NumberLine::new(3, 0, 20);
        let mut frontier = paths_from_start(&puzzle);
        assert_eq!(frontier.levels_expanded(), 0);
        assert_eq!(frontier.explored().len(), 1);

        let _ = frontier.by_ref().take(2).count();
        assert_eq!(frontier.levels_expanded(), 1);
        assert_eq!(frontier.explored().len(), 4);
        assert!([3, 4, 2, 6].iter().all(|n| frontier.explored().contains(n)));

        let _ = frontier.by_ref().take(3).count();
        assert_eq!(frontier.levels_expanded(), 2);
        assert_eq!(frontier.explored().len(), 9);

        let rest = frontier.by_ref().count();
        assert_eq!(5 + rest, 21);
        assert_eq!(frontier.explored().len(), 21);
    }

    #[test]
    fn test_frontier_is_lazy() {
        let puzzle = NumberLine::new(1, 9, 1_000);
        let first: Vec<_> = paths_from_start(&puzzle).take(1).collect();
        assert_eq!(first[0].state, 1);
        assert_eq!(puzzle.expansions.get(), 0);

        let _ = paths_from_start(&puzzle).take(3).count();
        assert_eq!(puzzle.expansions.get(), 1);
    }

    #[test]
    fn test_unbounded_puzzle_stream() {
        let first: Vec<_> = paths_from_start(&Lattice).take(25).collect();
        assert_eq!(first.len(), 25);
        // 1 + 4 + 8 + 12 states lie within three moves
        assert_eq!(first.iter().filter(|p| p.len() <= 3).count(), 25);
        assert!(first.windows(2).all(|w| w[0].len() <= w[1].len()));

        let moves = solution(&Lattice);
        assert_eq!(moves.len(), 5);
    }

    #[test]
    fn test_solution_is_forward_order() {
        let puzzle = NumberLine::new(1, 6, 20);
        let moves = solution(&puzzle);
        assert_eq!(moves.len(), 3);
        assert_eq!(replay(&puzzle, &moves), Some(6));
        let expected = brute_force_distances(&puzzle, 4);
        assert_eq!(expected.get(&6), Some(&moves.len()));
    }

    #[test]
    fn test_solution_when_start_is_goal() {
        let puzzle = NumberLine::new(5, 5, 10);
        assert!(solution(&puzzle).is_empty());
        let goal = paths_to_goal(&puzzle).next().unwrap();
        assert_eq!(goal.state, 5);
        assert!(goal.is_empty());
        assert_eq!(puzzle.expansions.get(), 0);
    }

    #[test]
    fn test_solution_when_goal_unreachable() {
        let puzzle = NumberLine::new(0, 11, 10);
        assert!(solution(&puzzle).is_empty());
        assert_eq!(paths_to_goal(&puzzle).count(), 0);
    }
}
