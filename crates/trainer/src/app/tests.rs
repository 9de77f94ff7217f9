    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::bootstrap::{parse_catalog_json, read_catalog_file, AppWiring};
    use super::console::{parse_script_commands, CommandRegistry, ParsedCommand, SessionCommand};
    use super::runner::{drive_interactive, run_interactive, run_script, Control, Runner, OUT_PREFIX};
    use super::transcript::{SCENE_PREFIX, UI_PREFIX};
    use trainer_core::procedure::{Flow, Popup};
    use trainer_core::{DissectionPhase, ProcedureDef, SpecimenCatalog, ToolKind};

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.borrow().clone())
                .expect("transcript is utf-8")
                .lines()
                .map(ToString::to_string)
                .collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn runner() -> (Runner<SharedBuffer>, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let wiring = AppWiring {
            definition: ProcedureDef::builtin(),
            catalog: SpecimenCatalog::builtin(),
        };
        let runner = Runner::new(wiring, buffer.clone(), buffer.clone(), buffer.clone());
        (runner, buffer)
    }

    fn feed(runner: &mut Runner<SharedBuffer>, lines: &[&str]) {
        for line in lines {
            assert_eq!(runner.handle_line(line), Control::Continue, "line: {line}");
        }
    }

    fn parse(line: &str) -> Result<Option<ParsedCommand>, String> {
        CommandRegistry::with_trainer_builtins().parse_line(line)
    }

    #[test]
    fn script_commands_skip_blanks_and_comments() {
        let content = "\n# pin the limbs\ntool pins\n   \n  click leftHand  \n#done\n";
        assert_eq!(
            parse_script_commands(content),
            vec!["tool pins".to_string(), "click leftHand".to_string()]
        );
    }

    #[test]
    fn help_lists_commands_in_registration_order() {
        let lines = CommandRegistry::with_trainer_builtins().help_lines();
        assert_eq!(lines[0], "help - List commands");
        assert_eq!(
            lines[1],
            "tool <pins|scissors|forceps|scalpel|none> - Select the active tool"
        );
        assert_eq!(lines[2], "click <target> [x y z] - Click a scene target");
    }

    #[test]
    fn unknown_command_reports_clear_error() {
        assert_eq!(
            parse("nope"),
            Err("error: unknown command 'nope'. try: help".to_string())
        );
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn bad_args_report_usage_hint() {
        assert_eq!(
            parse("tool wrench"),
            Err(
                "error: unknown tool 'wrench'. usage: tool <pins|scissors|forceps|scalpel|none>"
                    .to_string()
            )
        );
        assert_eq!(
            parse("click heart 1 nope 3"),
            Err(
                "error: invalid y coordinate 'nope' (expected f32). usage: click <target> [x y z]"
                    .to_string()
            )
        );
        assert!(parse("tick -1").is_err());
        assert!(parse("open lungs").is_err());
    }

    #[test]
    fn commands_parse_case_insensitively_with_arguments() {
        assert_eq!(
            parse("TOOL Scissors"),
            Ok(Some(ParsedCommand::Session(SessionCommand::SelectTool {
                tool: ToolKind::Scissors
            })))
        );
        assert_eq!(
            parse("click \"Plane026\" 0.5 1 -2"),
            Ok(Some(ParsedCommand::Session(SessionCommand::Click {
                target: "Plane026".to_string(),
                point: Some([0.5, 1.0, -2.0]),
            })))
        );
        assert_eq!(
            parse("open insects"),
            Ok(Some(ParsedCommand::Session(SessionCommand::Open {
                popup: Popup::Insects
            })))
        );
        assert_eq!(
            parse("flow preservation"),
            Ok(Some(ParsedCommand::Session(SessionCommand::SwitchFlow {
                flow: Flow::Preservation
            })))
        );
        assert!(parse("echo \"oops").is_err());
    }

    #[test]
    fn catalog_parse_error_names_json_path() {
        let raw = r#"{"insects":[{"key":"moth","common_name":"Moth","scientific_name":"x",
            "pinning_method":"y","order":"z","helpers":[7]}]}"#;
        let error = parse_catalog_json(raw).expect_err("helpers must be strings");
        assert!(error.contains("insects[0].helpers[0]"), "{error}");
    }

    #[test]
    fn catalog_validation_rejects_unusable_entries() {
        let empty_helpers = r#"{"insects":[{"key":"moth","common_name":"Moth","scientific_name":"x",
            "pinning_method":"y","order":"z","helpers":[]}]}"#;
        let error = parse_catalog_json(empty_helpers).expect_err("needs helpers");
        assert!(error.contains("insects[0].helpers"), "{error}");

        let bad_prefix = r#"{"insects":[{"key":"moth","common_name":"Moth","scientific_name":"x",
            "pinning_method":"y","order":"z","helpers":["Thorax"]}]}"#;
        let error = parse_catalog_json(bad_prefix).expect_err("prefix required");
        assert!(error.contains("'Thorax' does not start with 'Helper_'"), "{error}");
    }

    #[test]
    fn catalog_file_loads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bugs.json");
        std::fs::write(
            &path,
            r#"{"helper_prefix":"Spot_","insects":[{"key":"moth","common_name":"Moth",
                "scientific_name":"x","pinning_method":"y","order":"z","helpers":["Spot_1","Spot_2"]}]}"#,
        )
        .expect("write catalog");
        let catalog = read_catalog_file(&path).expect("catalog loads");
        assert_eq!(catalog.helper_prefix, "Spot_");
        assert_eq!(catalog.find("moth").map(|moth| moth.helpers.len()), Some(2));

        let missing = read_catalog_file(&dir.path().join("absent.json")).expect_err("missing file");
        assert!(missing.starts_with("read catalog"), "{missing}");
    }

    #[test]
    fn transcript_separates_scene_ui_and_replies() {
        let (mut runner, buffer) = runner();
        feed(
            &mut runner,
            &[
                "click dissectingPins",
                "click leftHand",
                "click rightHand",
                "click leftFoot",
                "click rightFoot",
                "tool scissors",
                "click centerBelly 0 0.5 0",
            ],
        );
        let lines = buffer.lines();
        assert!(lines[0].starts_with(UI_PREFIX), "{}", lines[0]);
        assert!(lines.contains(&format!(
            "{SCENE_PREFIX}{{\"command\":\"set_visible\",\"target\":\"centerBelly\",\"visible\":false}}"
        )));
        assert!(lines.iter().any(|line| line.starts_with(OUT_PREFIX)
            && line.contains("\"outcome\":\"advanced\"")
            && line.contains("\"next_expected\":\"leftTopSliceBelly\"")));
        assert!(lines.iter().any(|line| line
            == &format!("{UI_PREFIX}{{\"event\":\"notice\",\"text\":\"next expected: leftTopSliceBelly with tool scissors\"}}")));
    }

    #[test]
    fn warnings_clear_only_after_ticks() {
        let (mut runner, buffer) = runner();
        feed(&mut runner, &["tool forceps", "click leftHand", "tick 2.5"]);
        let cleared = format!("{UI_PREFIX}{{\"event\":\"toast_cleared\"}}");
        assert!(!buffer.lines().contains(&cleared));
        feed(&mut runner, &["tick 0.5"]);
        assert_eq!(buffer.lines().last(), Some(&cleared));
    }

    #[test]
    fn viewer_commands_and_popup_gate() {
        let (mut runner, buffer) = runner();
        feed(&mut runner, &["next", "open organs", "click leftHand"]);
        let lines = buffer.lines();
        assert!(lines.contains(&format!("{OUT_PREFIX}error: no viewer is open")));
        assert!(lines.iter().any(|line| line.starts_with(&format!("{OUT_PREFIX}Heart: "))));
        assert_eq!(
            lines.last(),
            Some(&format!("{OUT_PREFIX}{{\"kind\":\"blocked\"}}"))
        );
    }

    #[test]
    fn preservation_from_insect_viewer() {
        let (mut runner, buffer) = runner();
        feed(
            &mut runner,
            &["open insects", "preserve", "click Pin", "click Helper_Thorax"],
        );
        let lines = buffer.lines();
        assert!(lines.contains(&format!("{OUT_PREFIX}loaded stink: 1 pin(s) required")));
        assert!(lines.iter().any(|line| line.contains("\"outcome\":\"complete\"")));
        assert_eq!(runner.session().flow(), Flow::Preservation);
        assert_eq!(runner.session().tool(), ToolKind::None);
    }

    #[test]
    fn validate_reports_missing_targets() {
        let (mut runner, buffer) = runner();
        feed(&mut runner, &["validate leftHand notebook"]);
        let last = buffer.lines().last().cloned().expect("reply");
        assert!(last.starts_with(&format!("{OUT_PREFIX}error: ")), "{last}");
        assert!(last.contains("rightHand"), "{last}");
        assert!(!last.contains("scissors"), "{last}");
    }

    #[test]
    fn script_stops_at_quit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.txt");
        std::fs::write(
            &path,
            "# opening moves\ntool pins\nclick leftHand\nquit\nclick rightHand\n",
        )
        .expect("write script");
        let (mut runner, _buffer) = runner();
        run_script(&mut runner, &path).expect("script runs");
        assert_eq!(runner.session().dissection().pinned().len(), 1);
        assert_eq!(runner.session().dissection().phase(), DissectionPhase::Pinning);

        let missing = run_script(&mut runner, &dir.path().join("absent.txt"))
            .expect_err("missing script");
        assert!(missing.starts_with("failed to read script file"), "{missing}");
    }

    #[test]
    fn interactive_warning_expires_without_further_input() {
        let (mut runner, buffer) = runner();
        let (tx, rx) = mpsc::channel();
        tx.send(Ok("tool forceps".to_string())).expect("send");
        tx.send(Ok("click leftHand".to_string())).expect("send");
        let feeder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(3400));
            tx.send(Ok("quit".to_string())).expect("send quit");
        });
        drive_interactive(&mut runner, &rx, Duration::from_millis(20)).expect("loop runs");
        feeder.join().expect("feeder thread");

        let cleared = format!("{UI_PREFIX}{{\"event\":\"toast_cleared\"}}");
        assert!(buffer.lines().contains(&cleared));
    }

    #[test]
    fn interactive_input_ends_at_eof() {
        let (mut runner, _buffer) = runner();
        let input = io::Cursor::new(b"tool pins\nclick leftHand\n".to_vec());
        run_interactive(&mut runner, input).expect("interactive run");
        assert_eq!(runner.session().dissection().pinned().len(), 1);
    }
