//! End-to-end session scenarios against the scripted engine.
//!
//! These drive the presentation entry points the way a front end would: load,
//! browse a collection, read a member, write it, and reload.

use serde_json::json;

use probe::core::messages::Locale;
use probe::core::value::{FactObject, FactValue};
use probe::io::config::ProbeConfig;
use probe::session::{NoticeKind, Session};
use probe::test_support::{GraphScript, ScriptedEngine};

const W2_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

const DICTIONARY: &str = "\
/filingStatus
/formW2s/*/wages
/formW2s/*/employer
";

fn zh_tw() -> ProbeConfig {
    ProbeConfig {
        locale: Locale::ZhTw,
        ..ProbeConfig::default()
    }
}

#[test]
fn browse_collection_then_read_member() {
    let wages_path = format!("/formW2s/#{W2_ID}/wages");
    let dollars = FactObject::new()
        .with_type("Dollar")
        .with_display("52000.00")
        .with_field("cents", 5_200_000);
    let script = GraphScript::default().with_value(&wages_path, dollars.into());
    let mut session = Session::new(ScriptedEngine::new(script));

    let loaded = session.on_dictionary_loaded(DICTIONARY);
    assert_eq!(loaded.notice, None);

    let listing = session.on_collection_query_requested("/formW2s/");
    let text = listing.output.expect("listing");
    assert!(text.contains("• /formW2s/*/wages"));
    assert!(text.contains("• /formW2s/*/employer"));
    assert!(!text.contains("/filingStatus"));

    // Copying a listed path verbatim is caught before the engine sees it.
    let reply = session.on_get_requested("/formW2s/*/wages");
    assert_eq!(reply.notice.map(|n| n.kind), Some(NoticeKind::Validation));

    let reply = session.on_get_requested(&wages_path);
    assert_eq!(reply.output.as_deref(), Some("52000.00"));
}

#[test]
fn localized_violation_then_reload() {
    let outcome = FactValue::from_json(&json!({
        "valid": false,
        "limitViolations": [
            { "ruleName": "MaxLength", "factPath": "/filingStatus", "limitValue": 10, "actualValue": 14 }
        ]
    }));
    let script = GraphScript::default().with_set_result(Ok(Some(outcome)));
    let mut session = Session::from_config(ScriptedEngine::new(script), &zh_tw());
    session.on_dictionary_loaded(DICTIONARY);

    let reply = session.on_set_requested("/filingStatus", "marriedJointly");
    let notice = reply.notice.expect("violation notice");
    assert_eq!(notice.kind, NoticeKind::Violation);
    assert_eq!(
        notice.text,
        "限制：MaxLength / 路徑：/filingStatus / 限制值：10 / 實際值：14"
    );

    let reply = session.on_dictionary_loaded("/filingStatus\n");
    assert_eq!(reply.notice, None);
    assert_eq!(session.generation(), 2);
    let reply = session.on_collection_query_requested("/formW2s");
    assert_eq!(
        reply.output.as_deref(),
        Some(Locale::ZhTw.collection_not_found())
    );
}

#[test]
fn self_referencing_value_renders_with_marker() {
    let node = FactObject::new().with_field("name", "root");
    let node = FactValue::object(node);
    if let Some(object) = node.as_object() {
        object.insert("parent", node.clone());
    }
    let script = GraphScript::default().with_value("/tree", node);
    let mut session = Session::new(ScriptedEngine::new(script));
    session.on_dictionary_loaded("/tree\n");

    let reply = session.on_get_requested("/tree");
    let text = reply.output.expect("rendered");
    assert!(text.contains("\"name\": \"root\""));
    assert!(text.contains("[Circular]"));
}
