use crate::links::BrokenKind;
use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    FixLink,
    Consolidate,
    Refresh,
    Prune,
}

impl ActionKind {
    fn heading(self) -> &'static str {
        match self {
            ActionKind::FixLink => "Fix broken links",
            ActionKind::Consolidate => "Consolidate duplicates",
            ActionKind::Refresh => "Refresh stale documents",
            ActionKind::Prune => "Prune orphaned documents",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::FixLink => "fix_link",
            ActionKind::Consolidate => "consolidate",
            ActionKind::Refresh => "refresh",
            ActionKind::Prune => "prune",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    /// 1-based position in the plan.
    pub order: usize,
    pub kind: ActionKind,
    /// File to edit, with `:line` where one applies.
    pub target: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<PlannedAction>,
}

impl Plan {
    /// Links first, since consolidation and pruning move the files they
    /// point at. Then duplicates, stale documents and orphans.
    pub fn from_report(report: &Report) -> Plan {
        let mut actions: Vec<(ActionKind, String, String, Vec<String>)> = Vec::new();

        for b in &report.links.broken {
            let detail = match (b.kind, &b.suggestion) {
                (_, Some(s)) => format!("replace `{}` with `{s}`", b.raw),
                (BrokenKind::Placeholder, None) => format!("fill in placeholder target `{}`", b.raw),
                (BrokenKind::OutsideRoot, None) => {
                    format!("`{}` leaves the repository; link to a URL instead", b.raw)
                }
                (BrokenKind::MissingAnchor, None) => format!("no heading matches `{}`", b.raw),
                (BrokenKind::MissingFile, None) => {
                    format!("`{}` does not exist; update or remove the link", b.raw)
                }
            };
            actions.push((
                ActionKind::FixLink,
                format!("{}:{}", b.source, b.line),
                detail,
                b.resolved.iter().cloned().collect(),
            ));
        }

        for cluster in &report.duplicates.clusters {
            let related: Vec<String> = cluster
                .redundant()
                .map(|p| format!("{}:{}", p.path, p.line))
                .collect();
            actions.push((
                ActionKind::Consolidate,
                format!("{}:{}", cluster.authoritative, cluster.authoritative_line),
                format!(
                    "keep this passage; replace {} copy(ies) with a link to it",
                    related.len()
                ),
                related,
            ));
        }

        for s in &report.stale.stale {
            actions.push((
                ActionKind::Refresh,
                s.path.clone(),
                format!(
                    "review against {} source change(s), newest {} ({} days later)",
                    s.changed_sources.len(),
                    s.newest_source,
                    s.lag_days
                ),
                s.changed_sources.clone(),
            ));
        }

        for c in &report.orphans.candidates {
            actions.push((
                ActionKind::Prune,
                c.path.clone(),
                format!(
                    "unreferenced ({} words); link it from a root document or delete it",
                    c.word_count
                ),
                Vec::new(),
            ));
        }

        Plan {
            actions: actions
                .into_iter()
                .enumerate()
                .map(|(i, (kind, target, detail, related))| PlannedAction {
                    order: i + 1,
                    kind,
                    target,
                    detail,
                    related,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Checklist grouped by action kind.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Documentation maintenance plan\n");
        if self.actions.is_empty() {
            out.push_str("\nNothing to do.\n");
            return out;
        }
        for kind in [
            ActionKind::FixLink,
            ActionKind::Consolidate,
            ActionKind::Refresh,
            ActionKind::Prune,
        ] {
            let group: Vec<&PlannedAction> = self.actions.iter().filter(|a| a.kind == kind).collect();
            if group.is_empty() {
                continue;
            }
            out.push_str(&format!("\n## {} ({})\n\n", kind.heading(), group.len()));
            for a in group {
                out.push_str(&format!("- [ ] {}. `{}`: {}\n", a.order, a.target, a.detail));
                for r in &a.related {
                    out.push_str(&format!("  - `{r}`\n"));
                }
            }
        }
        out
    }
}
