//! Explicit single-task / multi-task dispatch.
//!
//! Public model methods accept one value per task. `MultiTask<T>` makes the
//! single-task and multi-task cases two explicit variants instead of relying
//! on run-time introspection of list-typed arguments: callers with one task
//! pass `Single`, callers with several pass `PerTask`, and results come back
//! in the same shape.

/// A per-task argument or result: one value, or an ordered value per task.
#[derive(Debug, Clone, PartialEq)]
pub enum MultiTask<T> {
    Single(T),
    PerTask(Vec<T>),
}

impl<T> MultiTask<T> {
    /// Number of tasks represented.
    pub fn n_tasks(&self) -> usize {
        match self {
            MultiTask::Single(_) => 1,
            MultiTask::PerTask(items) => items.len(),
        }
    }

    /// Flatten into an ordered per-task vector.
    pub fn into_tasks(self) -> Vec<T> {
        match self {
            MultiTask::Single(item) => vec![item],
            MultiTask::PerTask(items) => items,
        }
    }

    /// Borrow the per-task values in order.
    pub fn tasks(&self) -> Vec<&T> {
        match self {
            MultiTask::Single(item) => vec![item],
            MultiTask::PerTask(items) => items.iter().collect(),
        }
    }

    /// Re-wrap a per-task vector in the caller's shape: a singleton becomes
    /// `Single` when `multitask` is false, everything else stays `PerTask`.
    pub fn wrap(mut items: Vec<T>, multitask: bool) -> Self {
        if !multitask && items.len() == 1 {
            MultiTask::Single(items.remove(0))
        } else {
            MultiTask::PerTask(items)
        }
    }

    /// Apply `f` to every task's value, preserving the variant.
    pub fn map<U, F>(self, mut f: F) -> MultiTask<U>
    where
        F: FnMut(T) -> U,
    {
        match self {
            MultiTask::Single(item) => MultiTask::Single(f(item)),
            MultiTask::PerTask(items) => MultiTask::PerTask(items.into_iter().map(f).collect()),
        }
    }

    /// Unwrap a `Single` result, panicking on `PerTask`.
    pub fn into_single(self) -> T {
        match self {
            MultiTask::Single(item) => item,
            MultiTask::PerTask(_) => panic!("expected a single-task value, got per-task values"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_unwraps_singletons_for_single_task_callers() {
        let wrapped = MultiTask::wrap(vec![7], false);
        assert_eq!(wrapped, MultiTask::Single(7));
        let wrapped = MultiTask::wrap(vec![7, 8], true);
        assert_eq!(wrapped, MultiTask::PerTask(vec![7, 8]));
    }

    #[test]
    fn singleton_kept_as_per_task_in_multitask_mode() {
        let wrapped = MultiTask::wrap(vec![7], true);
        assert_eq!(wrapped, MultiTask::PerTask(vec![7]));
    }

    #[test]
    fn into_tasks_flattens_both_variants() {
        assert_eq!(MultiTask::Single(1).into_tasks(), vec![1]);
        assert_eq!(MultiTask::PerTask(vec![1, 2]).into_tasks(), vec![1, 2]);
    }

    #[test]
    fn map_preserves_variant() {
        let doubled = MultiTask::PerTask(vec![1, 2]).map(|v| v * 2);
        assert_eq!(doubled, MultiTask::PerTask(vec![2, 4]));
        let doubled = MultiTask::Single(3).map(|v| v * 2);
        assert_eq!(doubled, MultiTask::Single(6));
    }
}
