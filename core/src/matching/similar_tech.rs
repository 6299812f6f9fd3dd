//! Similar-Tech Table (spec §4.6 step 5; §9 design note (b)).
//!
//! A static, undirected equivalence-group table: entries in the same group
//! are treated as interchangeable enough to earn a partial-credit bonus when
//! a résumé lacks a JD-required keyword verbatim. The group membership is
//! drawn from the spec's own examples (`{react, next.js, remix}`,
//! `{fastapi, flask, django}`, `{postgres, mysql, mariadb}`); the
//! relationship tags are this crate's own documentation of each group, kept
//! here as plain data rather than hardcoded into the scoring logic, per the
//! spec's design note that this table should be exposed as data.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

pub struct TechGroup {
    pub relationship: &'static str,
    pub members: &'static [&'static str],
}

pub const GROUPS: &[TechGroup] = &[
    TechGroup {
        relationship: "frontend framework family",
        members: &["react", "next.js", "remix", "gatsby"],
    },
    TechGroup {
        relationship: "frontend framework family",
        members: &["vue", "nuxt"],
    },
    TechGroup {
        relationship: "frontend framework family",
        members: &["angular", "angularjs"],
    },
    TechGroup {
        relationship: "python web framework family",
        members: &["fastapi", "flask", "django"],
    },
    TechGroup {
        relationship: "relational database family",
        members: &["postgres", "postgresql", "mysql", "mariadb"],
    },
    TechGroup {
        relationship: "document database family",
        members: &["mongodb", "couchbase", "dynamodb"],
    },
    TechGroup {
        relationship: "node ecosystem family",
        members: &["node", "node.js", "deno", "bun"],
    },
    TechGroup {
        relationship: "jvm language family",
        members: &["java", "kotlin", "scala"],
    },
    TechGroup {
        relationship: "cloud provider family",
        members: &["aws", "gcp", "azure"],
    },
    TechGroup {
        relationship: "container orchestration family",
        members: &["kubernetes", "k8s", "docker swarm", "nomad"],
    },
    TechGroup {
        relationship: "ci/cd tooling family",
        members: &["github actions", "gitlab ci", "circleci", "jenkins"],
    },
    TechGroup {
        relationship: "api query layer family",
        members: &["graphql", "grpc", "trpc"],
    },
    TechGroup {
        relationship: "css tooling family",
        members: &["tailwind", "bootstrap", "bulma"],
    },
    TechGroup {
        relationship: "state management family",
        members: &["redux", "zustand", "mobx", "recoil"],
    },
    TechGroup {
        relationship: "frontend dom library family",
        members: &["jquery", "alpine.js"],
    },
    TechGroup {
        relationship: "typed javascript family",
        members: &["typescript", "flow"],
    },
    TechGroup {
        relationship: "legacy web scripting family",
        members: &["php", "perl"],
    },
    TechGroup {
        relationship: "systems language family",
        members: &["rust", "go", "c++"],
    },
];

static MEMBER_TO_GROUP: Lazy<FxHashMap<&'static str, usize>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    for (idx, group) in GROUPS.iter().enumerate() {
        for member in group.members {
            map.insert(*member, idx);
        }
    }
    map
});

/// Returns the relationship tag iff `a` and `b` are distinct keywords
/// belonging to the same equivalence group.
pub fn relationship_between(a: &str, b: &str) -> Option<&'static str> {
    if a == b {
        return None;
    }
    let group_a = *MEMBER_TO_GROUP.get(a)?;
    let group_b = *MEMBER_TO_GROUP.get(b)?;
    (group_a == group_b).then(|| GROUPS[group_a].relationship)
}

/// Every distinct keyword across every group.
pub fn vocabulary() -> impl Iterator<Item = &'static str> {
    GROUPS.iter().flat_map(|g| g.members.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn react_and_nextjs_share_a_group() {
        assert!(relationship_between("react", "next.js").is_some());
    }

    #[test]
    fn postgres_and_mysql_share_a_group() {
        assert!(relationship_between("postgres", "mysql").is_some());
    }

    #[test]
    fn unrelated_keywords_have_no_relationship() {
        assert!(relationship_between("react", "postgres").is_none());
    }

    #[test]
    fn identical_keywords_have_no_relationship() {
        assert!(relationship_between("react", "react").is_none());
    }
}
