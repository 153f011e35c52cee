//! Issue selection model for grouped audit views.
//!
//! When the issues view is grouped, selecting a whole group claims exactly
//! its member issues and locks their individual checkboxes; issues in other
//! groups stay individually selectable. This model mirrors that contract so
//! suites can assert on selection arithmetic before submitting a bulk audit.

use std::collections::{BTreeMap, BTreeSet};

use fortress_platform::IssueGroup;

use crate::error::{HarnessError, Result};

/// Selection state over a grouped issues view.
#[derive(Debug)]
pub struct IssueSelection {
    /// group name -> member issue ids
    groups: BTreeMap<String, Vec<u64>>,
    selected_groups: BTreeSet<String>,
    selected_issues: BTreeSet<u64>,
}

impl IssueSelection {
    /// Build the model from the server-side grouping response.
    #[must_use]
    pub fn new(groups: &[IssueGroup]) -> Self {
        let groups = groups
            .iter()
            .map(|g| (g.name.clone(), g.issue_ids.clone()))
            .collect();
        Self {
            groups,
            selected_groups: BTreeSet::new(),
            selected_issues: BTreeSet::new(),
        }
    }

    /// Select a whole group; returns how many issues the group claimed.
    ///
    /// Individually selected members are absorbed into the group selection.
    ///
    /// # Errors
    ///
    /// `ElementNotFound` for an unknown group name.
    pub fn select_group(&mut self, name: &str) -> Result<usize> {
        let members = self
            .groups
            .get(name)
            .ok_or_else(|| HarnessError::ElementNotFound(format!("issue group '{name}'")))?;
        for id in members {
            self.selected_issues.remove(id);
        }
        self.selected_groups.insert(name.to_string());
        Ok(members.len())
    }

    /// Unselect a group, releasing its members for individual selection.
    ///
    /// # Errors
    ///
    /// `ElementNotFound` for an unknown group name.
    pub fn unselect_group(&mut self, name: &str) -> Result<()> {
        if !self.groups.contains_key(name) {
            return Err(HarnessError::ElementNotFound(format!("issue group '{name}'")));
        }
        self.selected_groups.remove(name);
        Ok(())
    }

    /// Whether an issue's individual checkbox is usable: it must exist and
    /// its group must not be selected as a whole.
    #[must_use]
    pub fn is_issue_selectable(&self, issue_id: u64) -> bool {
        self.group_of(issue_id)
            .is_some_and(|group| !self.selected_groups.contains(group))
    }

    /// Select a single issue.
    ///
    /// # Errors
    ///
    /// `ElementNotFound` for an unknown id; selecting inside a selected
    /// group fails because the checkbox is disabled in that state.
    pub fn select_issue(&mut self, issue_id: u64) -> Result<()> {
        let group = self
            .group_of(issue_id)
            .ok_or_else(|| HarnessError::ElementNotFound(format!("issue {issue_id}")))?;
        if self.selected_groups.contains(group) {
            return Err(HarnessError::ElementNotFound(format!(
                "issue {issue_id} checkbox is disabled while group '{group}' is selected"
            )));
        }
        self.selected_issues.insert(issue_id);
        Ok(())
    }

    /// Unselect a single issue.
    pub fn unselect_issue(&mut self, issue_id: u64) {
        self.selected_issues.remove(&issue_id);
    }

    /// Every selected issue id: whole-group members plus individuals,
    /// ascending and deduplicated.
    #[must_use]
    pub fn selected_issue_ids(&self) -> Vec<u64> {
        let mut ids: BTreeSet<u64> = self.selected_issues.clone();
        for group in &self.selected_groups {
            if let Some(members) = self.groups.get(group) {
                ids.extend(members.iter().copied());
            }
        }
        ids.into_iter().collect()
    }

    fn group_of(&self, issue_id: u64) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, members)| members.contains(&issue_id))
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped_by_scan_type() -> Vec<IssueGroup> {
        // Mirrors the canonical fixture: 26 Open Source findings plus 4
        // Static findings when grouped by Scan Type.
        let open_source = IssueGroup {
            name: "Open Source".to_string(),
            count: 26,
            issue_ids: (1..=26).collect(),
        };
        let static_group = IssueGroup {
            name: "Static".to_string(),
            count: 4,
            issue_ids: vec![101, 102, 103, 104],
        };
        vec![open_source, static_group]
    }

    #[test]
    fn test_group_selection_claims_exact_members() {
        let mut selection = IssueSelection::new(&grouped_by_scan_type());
        let claimed = selection.select_group("Open Source").expect("group exists");
        assert_eq!(claimed, 26);
        assert_eq!(selection.selected_issue_ids(), (1..=26).collect::<Vec<_>>());
    }

    #[test]
    fn test_individual_checkbox_disabled_inside_selected_group() {
        let mut selection = IssueSelection::new(&grouped_by_scan_type());
        selection.select_group("Open Source").expect("group exists");

        assert!(!selection.is_issue_selectable(5));
        let err = selection.select_issue(5).expect_err("checkbox is disabled");
        assert!(err.to_string().contains("disabled"));

        // Static rows stay individually selectable
        assert!(selection.is_issue_selectable(103));
        selection.select_issue(103).expect("other group selectable");
        let mut expected: Vec<u64> = (1..=26).collect();
        expected.push(103);
        assert_eq!(selection.selected_issue_ids(), expected);
    }

    #[test]
    fn test_unselect_group_releases_members() {
        let mut selection = IssueSelection::new(&grouped_by_scan_type());
        selection.select_group("Open Source").expect("group exists");
        selection.unselect_group("Open Source").expect("group exists");

        assert!(selection.selected_issue_ids().is_empty());
        assert!(selection.is_issue_selectable(5));
        selection.select_issue(5).expect("released for selection");
    }

    #[test]
    fn test_group_selection_absorbs_individuals() {
        let mut selection = IssueSelection::new(&grouped_by_scan_type());
        selection.select_issue(7).expect("selectable");
        selection.select_group("Open Source").expect("group exists");
        selection.unselect_group("Open Source").expect("group exists");
        // individual selection was absorbed, not remembered
        assert!(selection.selected_issue_ids().is_empty());
    }

    #[test]
    fn test_unknown_group_and_issue() {
        let mut selection = IssueSelection::new(&grouped_by_scan_type());
        assert!(selection.select_group("Dynamic").is_err());
        assert!(selection.select_issue(999).is_err());
        assert!(!selection.is_issue_selectable(999));
    }
}
