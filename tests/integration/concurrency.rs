//! One knowledge base shared by sessions on many threads.

use std::sync::Arc;
use std::thread;

use rulebook_runtime::Session;

use crate::{MODES, knowledge, person, strings};

const RULES: &str = "package org.test\n\
    rule Pair when $p : Person( age >= 18 ) $i : Integer( this == $p.age ) then\n\
    insert(\"pair \" + $p.name + \" \" + $i);\n\
    end\n";

#[test]
fn sessions_on_threads_share_one_knowledge_base() {
    for mode in MODES {
        let kb = knowledge(mode, RULES);
        let workers: Vec<_> = (0..4_i64)
            .map(|worker| {
                let kb = Arc::clone(&kb);
                thread::spawn(move || {
                    let mut session = Session::new(kb);
                    for age in 18..28 {
                        session.insert(person(&format!("w{worker}"), age)).unwrap();
                        session.insert(age).unwrap();
                    }
                    session.fire_all_rules().unwrap();
                    let mut found = strings(&session);
                    found.sort();
                    found
                })
            })
            .collect();

        for (worker, handle) in workers.into_iter().enumerate() {
            let found = handle.join().unwrap();
            assert_eq!(found.len(), 10, "{mode}");
            assert!(found.iter().all(|s| s.starts_with(&format!("pair w{worker} "))));
        }
        assert_eq!(Arc::strong_count(&kb), 1);
    }
}

#[test]
fn sessions_are_independent() {
    let kb = knowledge(MODES[1], RULES);
    let mut left = Session::new(Arc::clone(&kb));
    let mut right = Session::new(kb);
    left.insert(person("Ann", 30)).unwrap();
    left.insert(30).unwrap();
    assert_eq!(left.agenda_len(), 1);
    assert_eq!(right.agenda_len(), 0);
    right.insert(30).unwrap();
    assert_eq!(right.fire_all_rules().unwrap(), 0);
    assert_eq!(left.fire_all_rules().unwrap(), 1);
}
