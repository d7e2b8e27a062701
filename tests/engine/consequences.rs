//! Integration tests for consequence execution against a recording
//! working memory.

use rulebook_engine::{KnowledgeBase, WorkingMemoryActions};
use rulebook_foundation::{
    Error, ErrorKind, FactHandle, Object, PropertyMask, Result, Value,
};

use crate::{MODES, build};

#[derive(Default)]
struct Recorder {
    next: u64,
    log: Vec<String>,
}

impl WorkingMemoryActions for Recorder {
    fn insert(&mut self, fact: Value) -> Result<FactHandle> {
        self.next += 1;
        self.log.push(format!("insert {fact:?}"));
        Ok(FactHandle::new(100 + self.next))
    }

    fn update(&mut self, handle: FactHandle, fact: Value, mask: Option<PropertyMask>) -> Result<()> {
        let mask = mask.map_or_else(|| "{*}".to_string(), |m| m.to_string());
        self.log.push(format!("update {handle} {fact} {mask}"));
        Ok(())
    }

    fn retract(&mut self, handle: FactHandle) -> Result<()> {
        if handle.id() == 99 {
            return Err(Error::unknown_handle(handle));
        }
        self.log.push(format!("retract {handle}"));
        Ok(())
    }

    fn print(&mut self, line: String) {
        self.log.push(format!("print {line}"));
    }
}

fn matteo() -> Value {
    Object::new("org.test.Person")
        .with("name", "Matteo")
        .with("age", 47)
        .into()
}

fn run(kb: &KnowledgeBase, rule: &str, handles: &[FactHandle], facts: Vec<Value>) -> Result<Vec<String>> {
    let mut recorder = Recorder::default();
    kb.rule_by_name(rule)
        .unwrap()
        .consequence()
        .execute(handles, facts, &mut recorder)?;
    Ok(recorder.log)
}

#[test]
fn modify_reports_assigned_fields() {
    for mode in MODES {
        let kb = build(
            mode,
            "package org.test\ndialect \"mvel\"\n\
             rule R2 when $p : Person() then\n\
             modify($p) { setAge(1); }\n\
             insert(\"Modified person age to 1 for: \"+$p.name)\n\
             end\n",
        )
        .unwrap();
        let log = run(&kb, "R2", &[FactHandle::new(1)], vec![matteo()]).unwrap();
        assert_eq!(
            log,
            vec![
                "update #1 Person(age=1, name=\"Matteo\") {age}".to_string(),
                "insert \"Modified person age to 1 for: Matteo\"".to_string(),
            ],
            "{mode}"
        );
    }
}

#[test]
fn update_reports_every_field() {
    for mode in MODES {
        let kb = build(
            mode,
            "package org.test\n\
             rule R when $p : Person() then\n\
             $p.setAge(2);\n\
             update($p);\n\
             end\n",
        )
        .unwrap();
        let log = run(&kb, "R", &[FactHandle::new(1)], vec![matteo()]).unwrap();
        assert_eq!(
            log,
            vec!["update #1 Person(age=2, name=\"Matteo\") {*}".to_string()],
            "{mode}"
        );
    }
}

#[test]
fn locals_constructors_and_printing() {
    for mode in MODES {
        let kb = build(
            mode,
            "package org.test\n\
             declare Address\n  street : String\nend\n\
             rule R when Integer() then\n\
             Address a = new Address(\"somewhere\");\n\
             System.out.println(a.street);\n\
             insert(a);\n\
             insert(new Person(\"Matteo\", 47));\n\
             end\n",
        )
        .unwrap();
        let log = run(&kb, "R", &[FactHandle::new(1)], vec![Value::Int(47)]).unwrap();
        assert_eq!(
            log,
            vec![
                "print somewhere".to_string(),
                "insert Address(street=\"somewhere\")".to_string(),
                "insert Person(age=47, name=\"Matteo\")".to_string(),
            ],
            "{mode}"
        );
    }
}

#[test]
fn branches_and_arithmetic() {
    for mode in MODES {
        let kb = build(
            mode,
            "package org.test\n\
             rule R when $p : Person() then\n\
             int next = $p.age + 1;\n\
             if (next > 40) { insert(next * 2); } else { insert(0); }\n\
             end\n",
        )
        .unwrap();
        let log = run(&kb, "R", &[FactHandle::new(1)], vec![matteo()]).unwrap();
        assert_eq!(log, vec!["insert 96".to_string()], "{mode}");
    }
}

#[test]
fn failures_keep_earlier_effects() {
    for mode in MODES {
        let kb = build(
            mode,
            "package org.test\n\
             rule R when $i : Integer() then\n\
             insert(\"before\");\n\
             retract($i);\n\
             insert(\"after\");\n\
             end\n",
        )
        .unwrap();
        let mut recorder = Recorder::default();
        let err = kb
            .rule_by_name("R")
            .unwrap()
            .consequence()
            .execute(&[FactHandle::new(99)], vec![Value::Int(1)], &mut recorder)
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownHandle(_)));
        assert_eq!(recorder.log, vec!["insert \"before\"".to_string()], "{mode}");
    }
}

#[test]
fn runtime_errors_surface() {
    for mode in MODES {
        let kb = build(
            mode,
            "package org.test\nrule R when $p : Person() then insert($p.age / 0); end\n",
        )
        .unwrap();
        let err = run(&kb, "R", &[FactHandle::new(1)], vec![matteo()]).unwrap_err();
        assert!(err.to_string().contains("division by zero"), "{mode}");
    }
}
