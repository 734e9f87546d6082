//! Provision builders shared by the engine's unit tests.

use std::collections::{BTreeMap, BTreeSet};

use lexverify_core::{Claim, Deadline, DurationUnit, Provision, ProvisionKind};

/// A provision whose kind follows its identifier prefix.
pub fn provision(id: &str, clauses: &[(&str, &str)]) -> Provision {
    let kind = if id.starts_with("Regulation") {
        ProvisionKind::Regulation
    } else {
        ProvisionKind::Article
    };
    let subsections: BTreeMap<String, String> = clauses
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Provision {
        id: id.to_string(),
        kind,
        title: String::new(),
        text: Some(clauses.iter().map(|(_, v)| *v).collect::<Vec<_>>().join(" ")),
        subsections: Some(subsections),
        deadlines: Vec::new(),
        restrictions: BTreeSet::new(),
    }
}

pub fn restrict(mut p: Provision, clause: &str) -> Provision {
    p.restrictions.insert(clause.to_string());
    p
}

pub fn deadline(trigger: &str, obligation: &str, duration: u32, unit: DurationUnit) -> Deadline {
    Deadline {
        trigger: trigger.to_string(),
        obligation: obligation.to_string(),
        duration,
        unit,
        clause: None,
        not_before: None,
    }
}

pub fn with_deadline(mut p: Provision, d: Deadline) -> Provision {
    p.deadlines.push(d);
    p
}

pub fn claim(subject: &str, obligation: &str, conditions: &[&str]) -> Claim {
    Claim {
        subject: subject.to_string(),
        obligation: obligation.to_string(),
        conditions: conditions.iter().map(|c| c.to_string()).collect(),
    }
}

/// The prohibition scenario: A forbids modifying A(2), B modifies it, C is
/// unrelated.
pub fn prohibition_corpus() -> Vec<Provision> {
    vec![
        restrict(
            provision(
                "Article 10",
                &[
                    ("1", "The receiver shall examine the debtor."),
                    ("2", "The examination procedure is fixed and may not be altered."),
                ],
            ),
            "2",
        ),
        provision(
            "Regulation 20",
            &[("a", "This regulation modifies Article 10(2) for summary cases.")],
        ),
        provision("Article 30", &[("1", "Fees are payable to the court.")]),
    ]
}

/// A small corpus modelled on summary bankruptcy administration.
pub fn bankruptcy_corpus() -> Vec<Provision> {
    let art16 = provision(
        "Article 16",
        &[("1", "The public examination of the debtor shall be held after the receiving order.")],
    );
    let art27 = provision(
        "Article 27",
        &[(
            "1",
            "The debtor may apply for discharge once the public examination is concluded under Article 16.",
        )],
    );
    let art28 = with_deadline(
        provision(
            "Article 28",
            &[(
                "1",
                "The official receiver shall apply for rehabilitation within four years of the conclusion of the public examination under Article 16.",
            )],
        ),
        deadline("conclusion of public examination", "apply for rehabilitation", 4, DurationUnit::Years),
    );
    let art58 = with_deadline(
        provision(
            "Article 58",
            &[("2", "The first dividend shall be declared within four months of the first meeting of creditors.")],
        ),
        deadline("first meeting of creditors", "declare first dividend", 4, DurationUnit::Months),
    );
    let art103 = restrict(
        provision(
            "Article 103",
            &[
                ("1", "Summary administration may be ordered by regulations made under Regulation 143."),
                ("2", "Nothing in summary administration permits modification of the provisions concerning examination."),
            ],
        ),
        "2",
    );
    let reg143 = with_deadline(
        provision(
            "Regulation 143",
            &[
                ("i", "The period in Article 58(2) is extended to six months."),
                ("ii", "The estate shall be distributed in a single dividend."),
            ],
        ),
        deadline("first meeting of creditors", "declare first dividend", 6, DurationUnit::Months),
    );
    vec![art16, art27, art28, art58, art103, reg143]
}
