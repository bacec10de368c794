//! Complete per-template outcome of one evaluation.

use keystone_types::Verdict;

/// Verdicts for every template of a catalog, in catalog order.
///
/// All templates are recorded even after a winner is found so tooling can
/// show the whole table. Order among templates that share a verdict is the
/// catalog order, which the first-valid tie-break relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerdictTable {
    entries: Vec<(usize, Verdict)>,
}

impl VerdictTable {
    /// An empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Drop every recorded verdict.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record the verdict for the template at `template_index`.
    pub fn record(&mut self, template_index: usize, verdict: Verdict) {
        self.entries.push((template_index, verdict));
    }

    /// Whether any template produced `verdict`.
    pub fn contains(&self, verdict: Verdict) -> bool {
        self.entries.iter().any(|&(_, v)| v == verdict)
    }

    /// The first template, in catalog order, that produced `verdict`.
    pub fn first(&self, verdict: Verdict) -> Option<usize> {
        self.templates_with(verdict).next()
    }

    /// Every template that produced `verdict`, in catalog order.
    pub fn templates_with(&self, verdict: Verdict) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .filter(move |&&(_, v)| v == verdict)
            .map(|&(index, _)| index)
    }

    /// The verdict recorded for one template.
    pub fn verdict_for(&self, template_index: usize) -> Option<Verdict> {
        self.entries
            .iter()
            .find(|&&(index, _)| index == template_index)
            .map(|&(_, v)| v)
    }

    /// All `(template index, verdict)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Verdict)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of recorded verdicts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> VerdictTable {
        let mut t = VerdictTable::new();
        t.record(0, Verdict::Invalid);
        t.record(1, Verdict::NotLoaded);
        t.record(2, Verdict::Valid);
        t.record(3, Verdict::Valid);
        t
    }

    #[test]
    fn first_valid_is_catalog_order() {
        assert_eq!(table().first(Verdict::Valid), Some(2));
    }

    #[test]
    fn keeps_every_template() {
        let t = table();
        assert_eq!(t.len(), 4);
        assert_eq!(t.templates_with(Verdict::Valid).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(t.verdict_for(1), Some(Verdict::NotLoaded));
        assert_eq!(t.verdict_for(7), None);
    }

    #[test]
    fn clear_empties() {
        let mut t = table();
        t.clear();
        assert!(t.is_empty());
        assert!(!t.contains(Verdict::Invalid));
        assert_eq!(t.first(Verdict::Valid), None);
    }
}
