//! End-to-end tests for the editor core: aggregation, the primary session,
//! nested regions, attribute editors, async menu actions and recovery.

use std::sync::{Arc, Mutex};

use reprose_author::reprose_model::{
    AttrSpec, Attrs, Command, EditorState, Fragment, Node, NodeSpec, Schema, Selection,
    Transaction,
};
use reprose_author::{
    attribute_editor_factory, features_to_schema, menu_group, nested_region_factory,
    reconcile_range, AttributeControl, BoxFuture, ChangeHandler, ContainerId, Editor,
    EditorConfig, EditorError, EditorResult, EventTarget, Feature, HeadlessHost, Keymap,
    MenuActivation, MenuOption, NestedRegionController, NodeView, NodeViewFactory,
    NodeViewPlugin, Platform, Plugin, RecoveryState, Rendered, SchemaPolicy, ViewContext,
    ViewEvent, ViewUpdate,
};
use serde_json::{json, Value};

type Log = Arc<Mutex<Vec<&'static str>>>;
type Changes = Arc<Mutex<Vec<Value>>>;

fn config() -> EditorConfig {
    EditorConfig {
        platform: Platform::Other,
        ..Default::default()
    }
}

fn paragraph() -> Feature {
    Feature::new("paragraph").with_node(
        "paragraph",
        NodeSpec::new().with_content("inline*").with_group("block"),
    )
}

fn link() -> Feature {
    Feature::new("link")
        .with_node(
            "link",
            NodeSpec::new()
                .with_content("text*")
                .with_group("inline")
                .inline()
                .atom()
                .with_attr("reference", AttrSpec::with_default("")),
        )
        .with_plugins(|_| {
            vec![Arc::new(
                NodeViewPlugin::new("link-views").with_view("link", nested_region_factory()),
            ) as Arc<dyn Plugin>]
        })
}

fn note() -> Feature {
    let control = AttributeControl::Select {
        options: vec![
            ("info".to_string(), "Info".to_string()),
            ("warning".to_string(), "Warning".to_string()),
        ],
    };
    Feature::new("note")
        .with_node(
            "note",
            NodeSpec::new()
                .with_content("paragraph+")
                .with_group("block")
                .with_attr("kind", AttrSpec::with_default("info")),
        )
        .with_plugins(move |_| {
            vec![Arc::new(
                NodeViewPlugin::new("note-views")
                    .with_view("note", attribute_editor_factory("kind", control.clone())),
            ) as Arc<dyn Plugin>]
        })
}

fn text(value: &str) -> Value {
    json!({ "type": "text", "text": value })
}

fn para_doc(value: &str) -> Value {
    json!({ "type": "doc", "content": [{ "type": "paragraph", "content": [text(value)] }] })
}

/// `doc(paragraph(link("abc")))`: the link sits at 1, its content at 2..5
fn link_doc(value: &str) -> Value {
    json!({
        "type": "doc",
        "content": [{
            "type": "paragraph",
            "content": [{
                "type": "link",
                "attrs": { "reference": "" },
                "content": [text(value)]
            }]
        }]
    })
}

fn recording() -> (ChangeHandler, Changes) {
    let seen: Changes = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler: ChangeHandler = Box::new(move |value: Value| sink.lock().unwrap().push(value));
    (handler, seen)
}

fn editor_with(features: &[Feature], initial: &Value, host: HeadlessHost) -> (Editor, Changes) {
    let (handler, seen) = recording();
    let editor = Editor::new(config(), features, initial, Some(handler), Box::new(host)).unwrap();
    (editor, seen)
}

fn recording_command(log: Log, name: &'static str) -> Command {
    Arc::new(move |_, _| {
        log.lock().unwrap().push(name);
        false
    })
}

fn binds(key: &'static str, command: Command) -> impl Fn(&Schema) -> Keymap + Send + Sync {
    move |_: &Schema| {
        let mut keymap = Keymap::new();
        keymap.insert(key.to_string(), command.clone());
        keymap
    }
}

fn doc_text(editor: &Editor) -> String {
    editor.state().unwrap().doc().text_content()
}

// -- Aggregation --

#[test]
fn test_key_binding_chain_falls_back_to_baseline() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let features = vec![
        paragraph().with_keymap(binds("Mod-a", recording_command(log.clone(), "first"))),
        Feature::new("second")
            .with_keymap(binds("Ctrl-a", recording_command(log.clone(), "second"))),
    ];
    let (mut editor, _) = editor_with(&features, &para_doc("ab"), HeadlessHost::new());

    assert!(editor.handle_key("Ctrl-a").unwrap());
    assert_eq!(log.lock().unwrap().as_slice(), &["second", "first"]);
    assert!(matches!(
        editor.state().unwrap().selection(),
        Selection::All { .. }
    ));
}

#[test]
fn test_menu_overwrite_keeps_later_declaration() {
    let noop: Command = Arc::new(|_, _| false);
    let first = noop.clone();
    let features = vec![
        paragraph().with_menu(move |_| {
            menu_group("blocks", [("plain", MenuOption::command("Paragraph", first.clone()))])
        }),
        Feature::new("override").with_menu(move |_| {
            menu_group("blocks", [("plain", MenuOption::command("Plain text", noop.clone()))])
        }),
    ];
    let (editor, _) = editor_with(&features, &para_doc("ab"), HeadlessHost::new());

    assert_eq!(editor.menu()["blocks"].len(), 1);
    assert_eq!(editor.menu()["blocks"]["plain"].label, "Plain text");
}

#[test]
fn test_schema_merge_is_deterministic() {
    let features = vec![paragraph(), link(), note()];
    let first = features_to_schema(&features, SchemaPolicy::Strict).unwrap();
    let second = features_to_schema(&features, SchemaPolicy::Strict).unwrap();
    assert_eq!(
        serde_json::to_vec(&first.descriptor).unwrap(),
        serde_json::to_vec(&second.descriptor).unwrap()
    );
}

#[test]
fn test_empty_feature_list_is_a_configuration_error() {
    let err = Editor::new(
        config(),
        &[],
        &para_doc("ab"),
        None,
        Box::new(HeadlessHost::new()),
    )
    .unwrap_err();
    assert!(matches!(err, EditorError::Configuration(_)));
}

// -- Primary session --

#[test]
fn test_typographic_rule_emits_one_change() {
    let (mut editor, seen) = editor_with(&[paragraph()], &para_doc("a-"), HeadlessHost::new());
    editor.set_selection(Selection::cursor(3)).unwrap();
    editor.handle_text_input("-").unwrap();

    assert_eq!(editor.to_json(), para_doc("a\u{2014}"));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

// -- Nested regions --

#[test]
fn test_nested_region_round_trip_without_edits() {
    let host = HeadlessHost::new();
    let (mut editor, seen) = editor_with(&[paragraph(), link()], &link_doc("abc"), host.clone());
    assert!(matches!(editor.view().unwrap().rendered(1), Some(Rendered::Text { .. })));

    editor.select_node(1).unwrap();
    assert_eq!(host.mounted().len(), 1);
    assert!(matches!(
        editor.view().unwrap().rendered(1),
        Some(Rendered::Region { .. })
    ));

    editor.set_selection(Selection::cursor(1)).unwrap();
    assert!(host.mounted().is_empty());
    assert_eq!(editor.to_json(), link_doc("abc"));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_nested_region_inner_edit_reaches_parent() {
    let host = HeadlessHost::new();
    let (mut editor, seen) = editor_with(&[paragraph(), link()], &link_doc("abc"), host.clone());
    editor.select_node(1).unwrap();
    let container = host.mounted()[0].0;

    let target = EventTarget::Container(container);
    assert!(editor
        .handle_event(&ViewEvent::SelectionChange {
            target,
            anchor: 1,
            head: 1,
        })
        .unwrap());
    assert!(editor
        .handle_event(&ViewEvent::TextInput {
            target,
            text: "X".to_string(),
        })
        .unwrap());

    assert_eq!(editor.to_json(), link_doc("aXbc"));
    assert_eq!(doc_text(&editor), "aXbc");
    assert_eq!(seen.lock().unwrap().as_slice(), &[link_doc("aXbc")]);
    // The region stays open on the edited node
    assert!(matches!(
        editor.view().unwrap().rendered(1),
        Some(Rendered::Region { ref text, .. }) if text == "aXbc"
    ));
}

#[test]
fn test_nested_region_events_are_not_parent_edits() {
    let host = HeadlessHost::new();
    let (mut editor, _) = editor_with(&[paragraph(), link()], &link_doc("abc"), host.clone());
    editor.select_node(1).unwrap();
    let container = host.mounted()[0].0;

    let view = editor.view().unwrap();
    assert!(view.ignores_mutation(&reprose_author::DomMutation {
        target: EventTarget::Container(container),
    }));
    assert!(!view.ignores_mutation(&reprose_author::DomMutation {
        target: EventTarget::Editor,
    }));
}

#[test]
fn test_nested_region_reconciliation_does_not_echo() {
    let host = HeadlessHost::new();
    let (mut editor, seen) = editor_with(&[paragraph(), link()], &link_doc("abc"), host.clone());
    editor.select_node(1).unwrap();

    let before = editor.view().unwrap().dispatch_count();
    let mut tr = editor.state().unwrap().tr();
    tr.insert_text("Z", 5, 5).unwrap();
    editor.dispatch(tr).unwrap();

    assert_eq!(editor.view().unwrap().dispatch_count(), before + 1);
    assert_eq!(editor.to_json(), link_doc("abcZ"));
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(matches!(
        editor.view().unwrap().rendered(1),
        Some(Rendered::Region { ref text, .. }) if text == "abcZ"
    ));
}

#[test]
fn test_deleting_node_destroys_its_region() {
    let host = HeadlessHost::new();
    let (mut editor, _) = editor_with(&[paragraph(), link()], &link_doc("abc"), host.clone());
    editor.select_node(1).unwrap();
    assert_eq!(host.mounted().len(), 1);

    let mut tr = editor.state().unwrap().tr();
    tr.delete(1, 6).unwrap();
    editor.dispatch(tr).unwrap();

    assert!(host.mounted().is_empty());
    assert!(editor.view().unwrap().node_views().is_empty());
}

#[test]
fn test_nested_region_in_read_only_editor_keeps_parent_content() {
    let host = HeadlessHost::new();
    let mut editor = Editor::new(
        config(),
        &[paragraph(), link()],
        &link_doc("abc"),
        None,
        Box::new(host.clone()),
    )
    .unwrap();
    editor.select_node(1).unwrap();
    let target = EventTarget::Container(host.mounted()[0].0);

    let typed = editor.handle_event(&ViewEvent::TextInput {
        target,
        text: "X".to_string(),
    });
    assert!(matches!(typed, Err(EditorError::ReadOnly)));
    // Keys still reach the child session, but edits are dropped there
    editor
        .handle_event(&ViewEvent::SelectionChange {
            target,
            anchor: 2,
            head: 2,
        })
        .unwrap();
    editor
        .handle_event(&ViewEvent::Key {
            target,
            combo: "Backspace".to_string(),
        })
        .unwrap();

    assert_eq!(editor.to_json(), link_doc("abc"));
    assert!(matches!(
        editor.view().unwrap().rendered(1),
        Some(Rendered::Region { ref text, .. }) if text == "abc"
    ));
}

/// Shows typed text at once and asks the parent to insert it with a
/// transaction built against the document the view was created on
struct EagerView {
    shown: String,
    created_on: EditorState,
}

impl NodeView for EagerView {
    fn render(&self) -> Rendered {
        Rendered::Text {
            text: self.shown.clone(),
        }
    }

    fn update(&mut self, node: &Node, _ctx: &mut ViewContext<'_>) -> ViewUpdate {
        self.shown = node.text_content();
        ViewUpdate::Kept
    }

    fn stop_event(&self, event: &ViewEvent) -> bool {
        matches!(event.target(), EventTarget::Container(_))
    }

    fn handle_event(&mut self, event: &ViewEvent, ctx: &mut ViewContext<'_>) -> bool {
        let ViewEvent::TextInput { text, .. } = event else {
            return false;
        };
        self.shown.push_str(text);
        let mut tr = self.created_on.tr();
        if tr.insert_text(text, ctx.pos() + 1, ctx.pos() + 1).is_err() {
            return false;
        }
        ctx.dispatch(tr);
        true
    }
}

#[test]
fn test_refused_view_transaction_resyncs_the_view() {
    let factory: NodeViewFactory = Arc::new(|node, ctx| {
        Box::new(EagerView {
            shown: node.text_content(),
            created_on: ctx.state().clone(),
        }) as Box<dyn NodeView>
    });
    let eager = Feature::new("eager-link")
        .with_node(
            "link",
            NodeSpec::new()
                .with_content("text*")
                .with_group("inline")
                .inline()
                .atom()
                .with_attr("reference", AttrSpec::with_default("")),
        )
        .with_plugins(move |_| {
            vec![Arc::new(NodeViewPlugin::new("eager").with_view("link", factory.clone()))
                as Arc<dyn Plugin>]
        });
    let (mut editor, _) = editor_with(&[paragraph(), eager], &link_doc("abc"), HeadlessHost::new());

    // An edit in front of the link moves it to 2 and leaves the view stale
    let mut tr = editor.state().unwrap().tr();
    tr.insert_text("Q", 1, 1).unwrap();
    editor.dispatch(tr).unwrap();

    let result = editor.handle_event(&ViewEvent::TextInput {
        target: EventTarget::Container(ContainerId(7)),
        text: "X".to_string(),
    });
    assert!(result.is_err());
    assert_eq!(doc_text(&editor), "Qabc");
    assert!(matches!(
        editor.view().unwrap().rendered(2),
        Some(Rendered::Text { ref text }) if text == "abc"
    ));
}

#[test]
fn test_nested_region_rebuilds_on_attribute_change() {
    let host = HeadlessHost::new();
    let (mut editor, _) = editor_with(&[paragraph(), link()], &link_doc("abc"), host.clone());
    editor.select_node(1).unwrap();
    let first = host.mounted()[0].0;

    let mut attrs = Attrs::new();
    attrs.insert("reference".to_string(), json!("https://example.com"));
    let mut tr = editor.state().unwrap().tr();
    tr.set_node_markup(1, "link", attrs).unwrap();
    editor.dispatch(tr).unwrap();

    let mounted = host.mounted();
    assert_eq!(mounted.len(), 1);
    assert_ne!(mounted[0].0, first);
    match editor.view().unwrap().rendered(1) {
        Some(Rendered::Region { container, text }) => {
            assert_eq!(container, mounted[0].0);
            assert_eq!(text, "abc");
        }
        other => panic!("expected an open region, got {:?}", other),
    }
}

#[test]
fn test_malformed_node_stays_flattened() {
    let schema = features_to_schema(&[paragraph(), link()], SchemaPolicy::Strict)
        .unwrap()
        .schema;
    // Links hold text only
    let broken = schema
        .node_from_json(&json!({
            "type": "link",
            "content": [{ "type": "paragraph", "content": [text("abc")] }]
        }))
        .unwrap();
    assert!(schema.check(&broken).is_err());

    let state = EditorState::from_json(schema.clone(), &link_doc("abc")).unwrap();
    let mut host = HeadlessHost::new();
    let mut outbox = Vec::new();
    let mut controller = NestedRegionController::new(&broken, schema, Platform::Other);
    let mut ctx = ViewContext::new(&state, 1, &mut host, &mut outbox);
    controller.select_node(&mut ctx);

    assert!(!controller.is_open());
    assert!(matches!(controller.render(), Rendered::Text { ref text } if text == "abc"));
    assert!(host.mounted().is_empty());
    assert!(outbox.is_empty());
}

#[test]
fn test_nested_region_keys_follow_configured_platform() {
    let host = HeadlessHost::new();
    let (handler, _) = recording();
    let mac = EditorConfig {
        platform: Platform::Mac,
        ..Default::default()
    };
    let mut editor = Editor::new(
        mac,
        &[paragraph(), link()],
        &link_doc("abc"),
        Some(handler),
        Box::new(host.clone()),
    )
    .unwrap();
    editor.select_node(1).unwrap();
    let target = EventTarget::Container(host.mounted()[0].0);

    let key = |combo: &str| ViewEvent::Key {
        target,
        combo: combo.to_string(),
    };
    assert!(editor.handle_event(&key("Meta-a")).unwrap());
    assert!(!editor.handle_event(&key("Ctrl-a")).unwrap());
}

#[test]
fn test_diff_range_overlap_correction() {
    let schema = features_to_schema(&[paragraph()], SchemaPolicy::Strict)
        .unwrap()
        .schema;
    let old = Fragment::from_node(schema.text("aabaa", vec![]));
    let new = Fragment::from_node(schema.text("aa", vec![]));

    let (start, end_new, end_old) = reconcile_range(&new, &old).unwrap();
    assert!(start <= end_old && end_old <= 5);

    let seed = schema.node("paragraph", Default::default(), old).unwrap();
    let target = schema.node("paragraph", Default::default(), new).unwrap();
    let child = EditorState::for_node(schema.clone(), seed).unwrap();
    let mut tr = child.tr();
    tr.replace(start, end_old, target.slice(start, end_new))
        .unwrap();
    assert_eq!(tr.doc().text_content(), "aa");
}

// -- Attribute editors --

#[test]
fn test_attribute_editor_change_rewrites_markup() {
    let host = HeadlessHost::new();
    let initial = json!({
        "type": "doc",
        "content": [{ "type": "note", "content": [{ "type": "paragraph" }] }]
    });
    let (mut editor, seen) = editor_with(&[paragraph(), note()], &initial, host.clone());

    let (container, request) = host.mounted()[0].clone();
    assert_eq!(request.kind, "attribute-editor");

    let target = EventTarget::Container(container);
    let rejected = editor
        .handle_event(&ViewEvent::Change {
            target,
            value: json!("danger"),
        })
        .unwrap();
    assert!(!rejected);
    assert!(seen.lock().unwrap().is_empty());

    editor
        .handle_event(&ViewEvent::Change {
            target,
            value: json!("warning"),
        })
        .unwrap();
    assert_eq!(editor.to_json()["content"][0]["attrs"]["kind"], json!("warning"));
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(
        editor.view().unwrap().rendered(0),
        Some(Rendered::Chrome {
            container,
            attr: "kind".to_string(),
            value: json!("warning"),
        })
    );
}

// -- Async menu actions --

fn appending(suffix: &'static str) -> Feature {
    paragraph().with_menu(move |_| {
        let action = Arc::new(move |state: &EditorState| {
            let end = state.doc().content().size() - 1;
            let mut tr = state.tr();
            let outcome = tr
                .insert_text(suffix, end, end)
                .map(|_| ())
                .map_err(EditorError::from);
            Box::pin(async move { outcome.map(|_| tr) }) as BoxFuture<EditorResult<Transaction>>
        });
        menu_group("inline", [("append", MenuOption::asynchronous("Append", action))])
    })
}

fn failing() -> Feature {
    paragraph().with_menu(|_| {
        let action = Arc::new(|_: &EditorState| {
            Box::pin(async { Err(EditorError::AsyncAction("request refused".to_string())) })
                as BoxFuture<EditorResult<Transaction>>
        });
        menu_group("inline", [("append", MenuOption::asynchronous("Append", action))])
    })
}

#[tokio::test]
async fn test_async_menu_action_dispatches_on_completion() {
    let (mut editor, seen) = editor_with(&[appending("!")], &para_doc("ab"), HeadlessHost::new());

    let MenuActivation::Pending(action) = editor.activate_menu_option("inline", "append").unwrap()
    else {
        panic!("expected a pending action");
    };
    assert!(seen.lock().unwrap().is_empty());

    editor.complete_menu_action(action.await).unwrap();
    assert_eq!(editor.to_json(), para_doc("ab!"));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stale_async_action_dispatches_nothing() {
    let (mut editor, seen) = editor_with(&[appending("!")], &para_doc("ab"), HeadlessHost::new());

    let MenuActivation::Pending(action) = editor.activate_menu_option("inline", "append").unwrap()
    else {
        panic!("expected a pending action");
    };
    editor.set_selection(Selection::cursor(3)).unwrap();
    editor.handle_text_input("c").unwrap();

    let err = editor.complete_menu_action(action.await).unwrap_err();
    assert!(matches!(err, EditorError::AsyncAction(_)));
    assert_eq!(editor.to_json(), para_doc("abc"));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_async_action_dispatches_nothing() {
    let (mut editor, seen) = editor_with(&[failing()], &para_doc("ab"), HeadlessHost::new());

    let MenuActivation::Pending(action) = editor.activate_menu_option("inline", "append").unwrap()
    else {
        panic!("expected a pending action");
    };
    let err = editor.complete_menu_action(action.await).unwrap_err();
    assert_eq!(err, EditorError::AsyncAction("request refused".to_string()));
    assert_eq!(editor.to_json(), para_doc("ab"));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_unknown_menu_option() {
    let (mut editor, _) = editor_with(&[paragraph()], &para_doc("ab"), HeadlessHost::new());
    let err = editor.activate_menu_option("inline", "missing").unwrap_err();
    assert_eq!(err.to_string(), "Unknown menu option: inline.missing");
}

// -- Recovery --

#[test]
fn test_fallback_recovery_cycle_through_editor() {
    let host = HeadlessHost::new();
    let invalid = json!({ "type": "doc", "content": [{ "type": "heading" }] });
    let (mut editor, seen) = editor_with(&[paragraph(), link()], &invalid, host.clone());
    assert!(editor.is_recovering());

    editor.edit_raw("{ \"type\": \"doc\", ").unwrap();
    let recovery = editor.recovery().unwrap();
    assert_eq!(recovery.state(), RecoveryState::InvalidJson);
    assert!(!recovery.draft().parse_error.as_deref().unwrap_or("").is_empty());
    assert!(recovery.draft().validation_error.is_none());

    editor
        .edit_raw(&json!({ "type": "doc", "content": [] }).to_string())
        .unwrap();
    let recovery = editor.recovery().unwrap();
    assert_eq!(recovery.state(), RecoveryState::InvalidSchema);
    assert!(!recovery.draft().validation_error.as_deref().unwrap_or("").is_empty());
    assert!(recovery.draft().parse_error.is_none());
    assert!(seen.lock().unwrap().is_empty());

    editor
        .edit_tree("/content", json!([{ "type": "paragraph", "content": [text("ok")] }]))
        .unwrap();
    assert!(!editor.is_recovering());
    assert_eq!(editor.to_json(), para_doc("ok"));
    assert_eq!(seen.lock().unwrap().as_slice(), &[para_doc("ok")]);

    // The rebuilt session edits as usual
    editor.set_selection(Selection::cursor(3)).unwrap();
    editor.handle_text_input("!").unwrap();
    assert_eq!(editor.to_json(), para_doc("ok!"));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn test_read_only_recovery_shows_errors() {
    let invalid = json!({ "type": "doc", "content": [{ "type": "heading" }] });
    let editor = Editor::new(
        config(),
        &[paragraph()],
        &invalid,
        None,
        Box::new(HeadlessHost::new()),
    )
    .unwrap();
    let recovery = editor.recovery().unwrap();
    assert!(recovery.is_read_only());
    assert_eq!(recovery.errors().len(), 1);
}
