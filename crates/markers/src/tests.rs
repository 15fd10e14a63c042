use crate::{Error, Marker, MarkerEnvironment, MarkerOp, MarkerValue, MarkerVariable};

fn marker(s: &str) -> Marker {
    s.parse().unwrap()
}

fn linux_py36() -> MarkerEnvironment {
    MarkerEnvironment {
        os_name: "posix".to_string(),
        sys_platform: "linux".to_string(),
        platform_machine: "x86_64".to_string(),
        platform_python_implementation: "CPython".to_string(),
        platform_system: "Linux".to_string(),
        python_version: "3.6".to_string(),
        python_full_version: "3.6.9".to_string(),
        implementation_name: "cpython".to_string(),
        implementation_version: "3.6.9".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_parse_comparison() {
    let m = marker("python_version >= \"3.6\"");
    assert_eq!(
        m,
        Marker::Comparison {
            lhs: MarkerValue::Variable(MarkerVariable::PythonVersion),
            op: MarkerOp::GreaterEq,
            rhs: MarkerValue::Literal("3.6".to_string()),
        }
    );
}

#[test]
fn test_parse_single_quotes() {
    assert_eq!(
        marker("sys_platform == 'win32'"),
        marker("sys_platform == \"win32\"")
    );
}

#[test]
fn test_precedence() {
    // and binds tighter than or.
    let m = marker("os_name == \"nt\" and python_version < \"3.0\" or sys_platform == \"linux\"");
    match m {
        Marker::Or(children) => {
            assert_eq!(children.len(), 2);
            assert!(matches!(children[0], Marker::And(_)));
            assert!(matches!(children[1], Marker::Comparison { .. }));
        }
        other => panic!("expected or at the top, got {:?}", other),
    }
}

#[test]
fn test_parens_override_precedence() {
    let m = marker("os_name == \"nt\" and (python_version < \"3.0\" or sys_platform == \"linux\")");
    match m {
        Marker::And(children) => {
            assert_eq!(children.len(), 2);
            assert!(matches!(children[1], Marker::Or(_)));
        }
        other => panic!("expected and at the top, got {:?}", other),
    }
}

#[test]
fn test_parse_errors() {
    match "".parse::<Marker>() {
        Err(Error::Empty) => (),
        other => panic!("unexpected: {:?}", other),
    }
    match "nosuch_var == \"x\"".parse::<Marker>() {
        Err(Error::UnknownVariable(name)) => assert_eq!(name, "nosuch_var"),
        other => panic!("unexpected: {:?}", other),
    }
    match "python_version >= \"3.6".parse::<Marker>() {
        Err(Error::UnterminatedString(_)) => (),
        other => panic!("unexpected: {:?}", other),
    }
    match "python_version >= \"3.6\" \"3.7\"".parse::<Marker>() {
        Err(Error::TrailingInput(_)) => (),
        other => panic!("unexpected: {:?}", other),
    }
    match "python_version >=".parse::<Marker>() {
        Err(Error::UnexpectedEnd(_)) => (),
        other => panic!("unexpected: {:?}", other),
    }
    match "(python_version >= \"3.6\"".parse::<Marker>() {
        Err(Error::UnexpectedEnd(_)) => (),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_version_comparison() {
    let env = linux_py36();
    assert!(marker("python_version >= \"3.6\"").evaluate(&env, &[]));
    assert!(!marker("python_version >= \"3.7\"").evaluate(&env, &[]));
    assert!(marker("python_version < \"4\"").evaluate(&env, &[]));
    // 3.6.9 vs 3.6: version semantics, not string prefix accident.
    assert!(marker("python_full_version > \"3.6\"").evaluate(&env, &[]));
    assert!(marker("python_version ~= \"3.4\"").evaluate(&env, &[]));
}

#[test]
fn test_version_comparison_reversed_operands() {
    let env = linux_py36();
    assert!(marker("\"3.6\" <= python_version").evaluate(&env, &[]));
    assert!(!marker("\"3.7\" <= python_version").evaluate(&env, &[]));
}

#[test]
fn test_string_comparison() {
    let env = linux_py36();
    assert!(marker("sys_platform == \"linux\"").evaluate(&env, &[]));
    assert!(marker("sys_platform != \"win32\"").evaluate(&env, &[]));
    assert!(marker("platform_python_implementation == \"CPython\"").evaluate(&env, &[]));
}

#[test]
fn test_membership() {
    let env = linux_py36();
    assert!(marker("\"linux\" in sys_platform").evaluate(&env, &[]));
    assert!(marker("sys_platform in \"linux linux2\"").evaluate(&env, &[]));
    assert!(marker("\"bsd\" not in sys_platform").evaluate(&env, &[]));
}

#[test]
fn test_boolean_evaluation() {
    let env = linux_py36();
    assert!(marker("sys_platform == \"linux\" and python_version >= \"3.6\"").evaluate(&env, &[]));
    assert!(!marker("sys_platform == \"win32\" and python_version >= \"3.6\"").evaluate(&env, &[]));
    assert!(marker("sys_platform == \"win32\" or python_version >= \"3.6\"").evaluate(&env, &[]));
}

#[test]
fn test_extra() {
    let env = MarkerEnvironment::default();
    let m = marker("extra == \"preimage\"");
    assert!(!m.evaluate(&env, &[]));
    assert!(m.evaluate(&env, &["preimage"]));
    assert!(m.evaluate(&env, &["plot", "preimage"]));
    // Extra names compare normalized.
    assert!(marker("extra == \"Pre_Image\"").evaluate(&env, &["pre-image"]));
}

#[test]
fn test_literal_comparison_is_accepted() {
    let env = MarkerEnvironment::default();
    assert!(marker("\"a\" == \"a\"").evaluate(&env, &[]));
    assert!(!marker("\"a\" == \"b\"").evaluate(&env, &[]));
}

#[test]
fn test_incomparable_comes_out_false() {
    let env = linux_py36();
    // ~= has no string fallback.
    assert!(!marker("sys_platform ~= \"linux\"").evaluate(&env, &[]));
}

#[test]
fn test_deprecated_dotted_variables() {
    let env = linux_py36();
    assert!(marker("sys.platform == \"linux\"").evaluate(&env, &[]));
    assert!(marker("os.name == \"posix\"").evaluate(&env, &[]));
}

#[test]
fn test_display_round_trip() {
    for text in [
        "python_version >= \"3.6\"",
        "sys_platform == \"linux\" and python_version >= \"3.6\"",
        "os_name == \"nt\" and (python_version < \"3.0\" or sys_platform == \"linux\")",
        "\"linux\" in sys_platform",
        "platform_machine not in \"arm arm64\"",
    ] {
        let m = marker(text);
        assert_eq!(m.to_string(), text);
        assert_eq!(marker(&m.to_string()), m);
    }
}

#[test]
fn test_environment_lookup() {
    let env = linux_py36();
    assert_eq!(env.get(MarkerVariable::SysPlatform), "linux");
    assert_eq!(env.get(MarkerVariable::Extra), "");
    assert_eq!(MarkerEnvironment::default().get(MarkerVariable::OsName), "");
}
