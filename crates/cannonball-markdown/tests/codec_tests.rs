use cannonball_core::prelude::*;
use cannonball_markdown::prelude::*;
use cannonball_markdown::TokenOverride;
use cannonball_test_utils::{arb_snapshot, find, statuses, IMPLEMENT_API, PICK_DB, RESEARCH_PLAN};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io::Write as _;

const BLOCKED: Status = Status::Work(WorkState::Blocked);
const OPEN: Status = Status::Work(WorkState::Open);
const DONE: Status = Status::Work(WorkState::Done);

#[test]
fn implement_api_example() {
    let mut doc = parse(IMPLEMENT_API).unwrap();
    assert_eq!(
        statuses(&mut doc),
        vec![
            ("Implement API".to_string(), BLOCKED),
            ("Design Endpoints".to_string(), OPEN),
            ("Backend Requirements".to_string(), DONE),
        ]
    );

    let design = find(&doc, "Design Endpoints");
    doc.set_status(design, DONE).unwrap();
    let api = find(&doc, "Implement API");
    assert_eq!(doc.effective_status(design).unwrap(), DONE);
    assert_eq!(doc.effective_status(api).unwrap(), OPEN);
}

#[test]
fn pick_db_example() {
    let mut doc = parse(PICK_DB).unwrap();
    let q = doc.by_anchor("q1").unwrap().id();
    assert_eq!(
        doc.effective_status(q).unwrap(),
        Status::Question(QuestionState::Resolved)
    );
    let nosql = find(&doc, "NoSQL");
    let sql = find(&doc, "SQL");
    assert_eq!(
        doc.effective_status(nosql).unwrap(),
        Status::Alternative(AlternativeState::Selected)
    );
    assert_eq!(
        doc.effective_status(sql).unwrap(),
        Status::Alternative(AlternativeState::Proposed)
    );

    let decision = find(&doc, "Use");
    doc.clear_selection(decision).unwrap();
    assert_eq!(
        doc.effective_status(q).unwrap(),
        Status::Question(QuestionState::Open)
    );
}

#[test]
fn research_plan_statuses() {
    let mut doc = parse(RESEARCH_PLAN).unwrap();
    let profile = doc.by_anchor("profile").unwrap().id();
    assert_eq!(doc.node(profile).unwrap().text(), "Profile the build\nmeasure cold and warm runs");

    let expect = [
        ("Link step dominates", BLOCKED),
        ("Profile the build", BLOCKED),
        ("Which linker?", Status::Question(QuestionState::Resolved)),
        ("Pick one", Status::Decision(DecisionState::Decided)),
        ("Roll out", BLOCKED),
        ("Incremental builds are fine", Status::None),
        ("Try gold linker", Status::Work(WorkState::Cancelled)),
    ];
    for (text, status) in expect {
        let id = find(&doc, text);
        assert_eq!(doc.effective_status(id).unwrap(), status, "{text}");
    }
}

#[test]
fn canonical_output() {
    let doc = parse(RESEARCH_PLAN).unwrap();
    let expected = "\
- [g] Faster builds ^goal
    - [P] Link step dominates [[#^profile]]
        - [e] Try mold linker ^mold
        - [e-] Try gold linker
    - [o] Incremental builds are fine
- [ ] Profile the build ^profile
  measure cold and warm runs
    - [x] Cold run
    - [/] Warm run
- [?] Which linker? ^linker
    - [a] mold ^use-mold
    - [a] lld
    - [D] Pick one ^alt(use-mold)
- [ ] Roll out [[#^linker]] [[#^mold]]
";
    assert_eq!(serialize(&doc), expected);
}

#[test]
fn serialization_is_idempotent() {
    for fixture in [IMPLEMENT_API, PICK_DB, RESEARCH_PLAN] {
        let once = serialize(&parse(fixture).unwrap());
        let twice = serialize(&parse(&once).unwrap());
        assert_eq!(once, twice);
    }
}

#[test]
fn choice_by_text_prefers_siblings() {
    let input = "\
- [?] First
    - [a] Redis
- [?] Second
    - [a] Redis
    - [D] Go with ^alt(Redis)
";
    let mut doc = parse(input).unwrap();
    let second = find(&doc, "Second");
    let first = find(&doc, "First");
    assert_eq!(
        doc.effective_status(second).unwrap(),
        Status::Question(QuestionState::Resolved)
    );
    assert_eq!(
        doc.effective_status(first).unwrap(),
        Status::Question(QuestionState::Open)
    );
    assert_eq!(serialize(&doc), input);
}

#[test]
fn custom_tokens_and_indent() {
    let config = CodecConfig {
        indent: IndentStyle::Auto,
        write_indent: Some(IndentStyle::Tabs),
        tokens: vec![TokenOverride {
            token: "X".into(),
            variant: Variant::Task,
            status: Some("done".into()),
            canonical: true,
        }],
    };
    let codec = Codec::new(config).unwrap();
    let doc = codec.parse("- [ ] parent\n  - [x] child\n").unwrap();
    assert_eq!(codec.serialize(&doc), "- [ ] parent\n\t- [X] child\n");
}

#[test]
fn config_file_drives_codec() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "write_indent = {{ spaces = 2 }}").unwrap();
    let config = CodecConfig::load(file.path()).unwrap();
    let codec = Codec::new(config).unwrap();
    let doc = codec.parse(IMPLEMENT_API).unwrap();
    assert_eq!(
        codec.serialize(&doc),
        "- [ ] Implement API\n  - [ ] Design Endpoints\n    - [x] Backend Requirements\n"
    );
}

#[test]
fn fixed_read_indent_reads_its_own_output() {
    let codec = Codec::new(CodecConfig::from_toml_str("indent = { spaces = 2 }").unwrap()).unwrap();
    let doc = codec.parse("- [ ] a\n  - [ ] b\n    - [x] c\n").unwrap();
    let text = codec.serialize(&doc);
    assert_eq!(text, "- [ ] a\n  - [ ] b\n    - [x] c\n");
    assert_eq!(codec.parse(&text).unwrap().to_snapshot(), doc.to_snapshot());
}

#[test]
fn literal_markup_survives_round_trip() {
    let input = "\
- \\[x] literally
- [ ] see \\^note
- [I] first
  \\- not a bullet
  C:\\\\tmp
- [?] Which DB? ^q
    - [a] SQL
    - [a] SQL
    - [a] Postgres (v15)
    - [D] Take the second ^alt(#2)
    - [D] Or ^alt(Postgres \\(v15\\))
";
    let mut doc = parse(input).unwrap();
    assert_eq!(serialize(&doc), input);

    let texts: Vec<String> = doc.traverse().map(|n| n.text().to_string()).collect();
    assert_eq!(texts[0], "[x] literally");
    assert_eq!(texts[1], "see ^note");
    assert_eq!(texts[2], "first\n- not a bullet\nC:\\tmp");
    assert_eq!(doc.len(), 9);
    assert_eq!(doc.traverse().next().unwrap().variant(), Variant::Bullet);

    let alts: Vec<NodeId> = doc
        .traverse()
        .filter(|n| n.variant() == Variant::Alternative)
        .map(|n| n.id())
        .collect();
    let selected = Status::Alternative(AlternativeState::Selected);
    assert_ne!(doc.effective_status(alts[0]).unwrap(), selected);
    assert_eq!(doc.effective_status(alts[1]).unwrap(), selected);
    assert_eq!(doc.effective_status(alts[2]).unwrap(), selected);
}

#[test]
fn hand_written_choice_with_parentheses() {
    let input = "- [?] q\n    - [a] Postgres (v15)\n    - [D] Use ^alt(Postgres (v15))\n";
    let mut doc = parse(input).unwrap();
    let q = find(&doc, "q");
    assert_eq!(
        doc.effective_status(q).unwrap(),
        Status::Question(QuestionState::Resolved)
    );
    assert!(serialize(&doc).ends_with("^alt(Postgres \\(v15\\))\n"));
}

#[test]
fn legacy_markers_are_read() {
    let input = "- [q] open question\n- [!] stuck task\n- [G] goal\n- [~] goal too\n- [%] trial\n";
    let doc = parse(input).unwrap();
    let kinds: Vec<(Variant, Status)> = doc
        .traverse()
        .map(|n| (n.variant(), n.explicit_status()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (Variant::Question, Status::Question(QuestionState::Open)),
            (Variant::Task, OPEN),
            (Variant::Goal, Status::None),
            (Variant::Goal, Status::None),
            (Variant::Experiment, OPEN),
        ]
    );
    assert_eq!(
        serialize(&doc),
        "- [?] open question\n- [ ] stuck task\n- [g] goal\n- [g] goal too\n- [e] trial\n"
    );
}

#[test]
fn empty_input() {
    let doc = parse("\n\n   \n").unwrap();
    assert!(doc.is_empty());
    assert_eq!(serialize(&doc), "");
}

proptest! {
    #[test]
    fn prop_round_trip(snapshot in arb_snapshot()) {
        let doc = Document::from_snapshot(&snapshot).unwrap();
        let text = serialize(&doc);
        let reparsed = parse(&text);
        prop_assert!(reparsed.is_ok(), "{:?}\n{}", reparsed.err(), text);
        prop_assert_eq!(reparsed.unwrap().to_snapshot(), snapshot);
    }

    #[test]
    fn prop_tabs_and_spaces_agree(snapshot in arb_snapshot()) {
        let doc = Document::from_snapshot(&snapshot).unwrap();
        let tabs = Codec::new(CodecConfig {
            write_indent: Some(IndentStyle::Tabs),
            ..CodecConfig::default()
        })
        .unwrap();
        let reparsed = parse(&tabs.serialize(&doc)).unwrap();
        prop_assert_eq!(reparsed.to_snapshot(), snapshot);
    }
}
