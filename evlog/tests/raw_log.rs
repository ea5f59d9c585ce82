use alloy_primitives::{hex, B256};
use eth_log_opcodes::Opcode;
use evlog::{
    asm::Instruction,
    ast::{FunctionDecl, Item, LogCallSite, SourceUnit, StorageDecl},
    compile,
    exec::{run_code, TxResult},
    test_utils::{initialize_logger, store_value, with_prelude},
    types::{Argument, Loc, StaticType, Value},
    CompileOptions, TypeError,
};

fn run_raw_log(topics: Vec<Argument>, data: Argument, prelude: Vec<Instruction>) -> (Vec<Instruction>, TxResult) {
    initialize_logger();

    let unit = SourceUnit::new(vec![Item::Function(FunctionDecl::new(
        "foo",
        vec![LogCallSite::raw(topics, data)],
    ))]);
    let artifacts = compile(&unit, &CompileOptions::default()).expect("Compilation failed");
    let code = artifacts.function("foo").unwrap().code.clone();
    let result = run_code(with_prelude(prelude, &code)).expect("Error executing tx");

    (code, result)
}

#[test]
fn test_raw_log_constant_data() {
    let (_, result) = run_raw_log(vec![], Argument::bytes("moo"), vec![]);

    assert_eq!(result.logs.len(), 1);
    assert!(result.logs[0].data.topics().is_empty());
    assert_eq!(result.logs[0].data.data.to_vec(), b"moo".to_vec());
}

#[test]
fn test_raw_log_with_topic() {
    let topic = hex!("1234567812345678123456781234567812345678123456781234567812345678");
    let (_, result) = run_raw_log(vec![Argument::bytes(topic)], Argument::bytes("moo2"), vec![]);

    let log = &result.logs[0];
    assert_eq!(log.data.topics(), &[B256::from(topic)]);
    assert_eq!(log.data.data.to_vec(), b"moo2".to_vec());
}

#[test]
fn test_raw_log_from_memory() {
    // A storage byte-string loaded into memory, and a function input.
    for (text, ty) in [("moo3", StaticType::bytes(100)), ("moo4", StaticType::bytes(100))] {
        let prelude = store_value(0x80, &ty, &Value::bytes(text));
        let (_, result) = run_raw_log(vec![], Argument::memory(ty, 0x80), prelude);

        assert_eq!(result.logs[0].data.data.to_vec(), text.as_bytes().to_vec());
    }

    // Longer than a word.
    let long = "a byte-string that spans more than a single memory word";
    let ty = StaticType::bytes(100);
    let prelude = store_value(0x80, &ty, &Value::bytes(long));
    let (_, result) = run_raw_log(vec![], Argument::memory(ty, 0x80), prelude);
    assert_eq!(result.logs[0].data.data.to_vec(), long.as_bytes().to_vec());
}

#[test]
fn test_raw_log_long_constant_data() {
    let data = [0x42u8; 70];
    let (_, result) = run_raw_log(vec![], Argument::bytes(data), vec![]);
    assert_eq!(result.logs[0].data.data.to_vec(), data.to_vec());
}

#[test]
fn test_raw_log_topic_counts() {
    let expected = [
        Opcode::Log0,
        Opcode::Log1,
        Opcode::Log2,
        Opcode::Log3,
        Opcode::Log4,
    ];

    for (count, op) in expected.into_iter().enumerate() {
        let topics = (0..count)
            .map(|i| Argument::int(i as i128 + 1))
            .collect::<Vec<_>>();
        let (code, result) = run_raw_log(topics, Argument::bytes(""), vec![]);

        assert_eq!(
            code.iter()
                .filter(|i| matches!(i, Instruction::Op(o) if o.to_string().starts_with("LOG")))
                .count(),
            1
        );
        assert!(code.contains(&Instruction::Op(op)));

        // Topics are passed through, no signature hash is injected.
        let log = &result.logs[0];
        assert_eq!(
            log.data.topics(),
            (1..=count as u8).map(B256::with_last_byte).collect::<Vec<_>>()
        );
        assert!(log.data.data.is_empty());
    }
}

#[test]
fn test_raw_log_with_five_topics_fails() {
    let unit = SourceUnit::new(vec![
        Item::Storage(StorageDecl {
            name: "s".into(),
            ty: "bytes <= 100".into(),
            loc: Loc::new(2, 1),
        }),
        Item::Function(FunctionDecl::new(
            "foo",
            vec![LogCallSite::raw(vec![Argument::int(1); 5], Argument::bytes("moo")).at(Loc::new(6, 5))],
        )),
    ]);

    let diagnostics = compile(&unit, &CompileOptions::default()).unwrap_err();
    assert_eq!(
        diagnostics.type_errors().collect::<Vec<_>>(),
        vec![&TypeError::TooManyTopics(5)]
    );
    assert_eq!(diagnostics.errors()[0].to_string(), "6:5: raw_log takes at most 4 topics, got 5");
}
