//! Cross-reference linking
//!
//! Runs after the contributing adapters have finished. Takes two adapted
//! collections and returns a new parent collection whose child field holds
//! every child with a matching key. The child field is replaced, not appended
//! to, so linking the same collections again yields the same result.

/// Link `children` into `parents` by key equality.
///
/// A `None` key (e.g. an unresolvable foreign key) never matches.
pub fn link<P, C, K, FP, FC, A>(
    parents: &[P],
    children: &[C],
    parent_key: FP,
    child_key: FC,
    attach: A,
) -> Vec<P>
where
    P: Clone,
    C: Clone,
    K: PartialEq,
    FP: Fn(&P) -> Option<K>,
    FC: Fn(&C) -> Option<K>,
    A: Fn(&mut P, Vec<C>),
{
    parents
        .iter()
        .map(|parent| {
            let mut linked = parent.clone();
            let matches = match parent_key(parent) {
                Some(key) => children
                    .iter()
                    .filter(|child| child_key(child).as_ref() == Some(&key))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            };
            attach(&mut linked, matches);
            linked
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Network {
        id: &'static str,
        rules: Vec<Rule>,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Rule {
        name: &'static str,
        network: Option<&'static str>,
    }

    fn link_rules(networks: &[Network], rules: &[Rule]) -> Vec<Network> {
        link(
            networks,
            rules,
            |n: &Network| Some(n.id),
            |r: &Rule| r.network,
            |n: &mut Network, rules| n.rules = rules,
        )
    }

    fn fixtures() -> (Vec<Network>, Vec<Rule>) {
        let networks = vec![
            Network { id: "default", rules: vec![] },
            Network { id: "prod", rules: vec![] },
        ];
        let rules = vec![
            Rule { name: "allow-ssh", network: Some("default") },
            Rule { name: "deny-all", network: Some("prod") },
            Rule { name: "orphan", network: None },
            Rule { name: "allow-http", network: Some("default") },
        ];
        (networks, rules)
    }

    #[test]
    fn test_children_attached_by_key_in_order() {
        let (networks, rules) = fixtures();
        let linked = link_rules(&networks, &rules);

        let names: Vec<_> = linked[0].rules.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["allow-ssh", "allow-http"]);
        assert_eq!(linked[1].rules.len(), 1);
        // Inputs are untouched
        assert!(networks[0].rules.is_empty());
    }

    #[test]
    fn test_relinking_does_not_duplicate() {
        let (networks, rules) = fixtures();
        let once = link_rules(&networks, &rules);
        let twice = link_rules(&once, &rules);
        assert_eq!(once, twice);
    }
}
