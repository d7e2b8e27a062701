//! Rule files written in the relaxed dialect, run end to end.

use rulebook_foundation::Value;
use rulebook_storage::ObjectFilter;

use crate::{MODES, person, session, strings};

#[test]
fn insert_from_consequence() {
    let rules = "rule R\n\
                 dialect \"mvel\"\n\
                 when\n  Integer()\n\
                 then\n  System.out.println(\"Hello World\");\n  insert(\"Hello World\");\n\
                 end\n";
    for mode in MODES {
        let mut session = session(mode, rules);
        session.insert(47).unwrap();
        assert_eq!(session.fire_all_rules().unwrap(), 1);
        assert_eq!(strings(&session), vec!["Hello World"], "{mode}");
        assert_eq!(session.output(), ["Hello World"]);
    }
}

#[test]
fn modify_with_setter() {
    let rules = "import org.test.Person;\n\
                 rule R\n\
                 dialect \"mvel\"\n\
                 when\n  $p : Person()\n\
                 then\n  modify($p) { setAge(1); }\n\
                 end\n";
    for mode in MODES {
        let mut session = session(mode, rules);
        let handle = session.insert(person("Matteo", 47)).unwrap();
        assert_eq!(session.fire_all_rules().unwrap(), 1, "{mode}");
        assert_eq!(session.get_object(handle), Some(&person("Matteo", 1)));
    }
}

#[test]
fn statements_without_semicolons() {
    let rules = "package mypackage;dialect \"mvel\"\n\
                 import org.test.Person;\n\
                 rule R1\nwhen\n  Integer()\nthen\n\
                 \x20 System.out.println(\"Hello World\")\n\
                 \x20 insert(new Person(\"Matteo\", 47))\n\
                 \x20 insert(\"Hello World\")\n\
                 end\n\
                 rule R2\nwhen\n  $p : Person()\nthen\n\
                 \x20 modify($p) { setAge(1); }\n\
                 \x20 insert(\"Modified person age to 1 for: \"+$p.name)\n\
                 end\n\
                 rule R3\nwhen\n  $s : String( this == \"Hello World\")\n  $p : Person()\nthen\n\
                 \x20 retract($s)end\n";
    for mode in MODES {
        let mut session = session(mode, rules);
        session.insert(47).unwrap();
        session.fire_all_rules().unwrap();

        let strings = strings(&session);
        assert!(!strings.contains(&"Hello World".to_string()), "{mode}");
        assert!(strings.contains(&"Modified person age to 1 for: Matteo".to_string()));

        let people = session.query_objects(&ObjectFilter::of_type("Person"));
        assert_eq!(people, vec![person("Matteo", 1)]);
    }
}

#[test]
fn local_declarations_and_wildcard_imports() {
    let rules = "import org.test.*;\n\
                 rule R\n\
                 dialect \"mvel\"\n\
                 when\n  $p : Person()\n\
                 then\n  Address a = new Address(\"somewhere\");\n  insert(a);\n\
                 end\n";
    for mode in MODES {
        let mut session = session(mode, rules);
        session.insert(person("Matteo", 47)).unwrap();
        session.fire_all_rules().unwrap();
        let addresses = session.query_objects(&ObjectFilter::of_type("Address"));
        assert_eq!(addresses.len(), 1, "{mode}");
        assert_eq!(addresses[0].field("street"), Some(&Value::from("somewhere")));
    }
}

fn ten_imports() -> String {
    (1..=10).map(|i| format!("import org.test.TempDecl{i};\n")).collect()
}

fn ten_pattern_rule() -> String {
    let patterns: String = (1..=10)
        .map(|i| format!("  $i{i} : TempDecl{i}()\n"))
        .collect();
    format!("rule R\ndialect \"mvel\"\nwhen\n{patterns}then\n  insert(\"matched\");\nend\n")
}

#[test]
fn ten_declarations() {
    let rules = format!("\n{}{}", ten_imports(), ten_pattern_rule());
    for mode in MODES {
        let mut session = session(mode, &rules);
        for i in 1..=10 {
            let fact = session.instantiate(&format!("TempDecl{i}"), vec![]).unwrap();
            session.insert(fact).unwrap();
        }
        session.fire_all_rules().unwrap();
        assert_eq!(strings(&session), vec!["matched"], "{mode}");
    }
}

#[test]
fn ten_declarations_seeded_by_a_patternless_rule() {
    let inserts: String = (1..=10)
        .map(|i| format!("  insert( new TempDecl{i}() );\n"))
        .collect();
    let rules = format!(
        "\n{}rule Rinit\ndialect \"mvel\"\nwhen\nthen\n{inserts}end\n{}",
        ten_imports(),
        ten_pattern_rule()
    );
    for mode in MODES {
        let mut session = session(mode, &rules);
        assert_eq!(session.agenda_len(), 1);
        assert_eq!(session.fire_all_rules().unwrap(), 2, "{mode}");
        assert_eq!(strings(&session), vec!["matched"]);
        assert_eq!(session.fact_count(), 11);
    }
}
