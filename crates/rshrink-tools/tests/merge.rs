//! Scénarios bout en bout : émission, relecture, fusion et conflits.

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rshrink_classfile::{AccessFlags, ClassFile, ClassWriter, CLINIT, CLINIT_DESCRIPTOR, JAVA_LANG_OBJECT};
use rshrink_core::{
    bytecode::{opcodes, FieldRef},
    ConstValue, Error, Insn, SymbolTable,
};
use rshrink_tools::{
    build_artifact, emit, run_merge, scan, scan_class, Config, EmitOptions, MergeOptions, ScanOptions, TypeFilter,
};

fn filter() -> TypeFilter { TypeFilter::resource_classes().unwrap() }

fn table(scalars: &[(&str, i32)], arrays: &[(&str, &[i32])]) -> SymbolTable {
    let mut t = SymbolTable::new();
    for (name, v) in scalars {
        t.insert_symbol(name, *v).unwrap();
    }
    for (name, values) in arrays {
        t.insert_array(name, values.to_vec()).unwrap();
    }
    t
}

fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    (tmp, path)
}

#[test]
fn two_arrays_end_to_end() {
    let t = table(&[], &[("styleables.a", &[1, 2, 3]), ("styleables.b", &[1, 2, 3])]).freeze();
    let bytes = build_artifact(&t, &EmitOptions::default()).unwrap();

    let class = ClassFile::from_bytes(&bytes).unwrap();
    assert_eq!(class.this_class, "R$styleable");
    assert_eq!(class.major_version, 50);
    assert_eq!(class.access, AccessFlags::PUBLIC | AccessFlags::SYNTHETIC | AccessFlags::SUPER);
    let fields: Vec<_> = class.fields.iter().map(|f| (f.name.as_str(), f.descriptor.as_str())).collect();
    assert_eq!(fields, vec![("styleables.a", "[I"), ("styleables.b", "[I")]);
    for f in &class.fields {
        assert_eq!(f.access, AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL);
    }

    let decoded = scan_class(&bytes, &filter()).unwrap();
    assert_eq!(decoded.array("styleables.a"), Some(&[1, 2, 3][..]));
    assert_eq!(decoded, *t);
}

#[test]
fn scalars_and_arrays_round_trip() {
    let t = table(
        &[("R$styleable.Theme_color", 0x7f01_0004), ("R$styleable.Theme_size", 1)],
        &[("Theme", &[0x7f01_0004, 0x7f01_0005, -7, 40_000])],
    )
    .freeze();
    let bytes = build_artifact(&t, &EmitOptions::default()).unwrap();
    assert_eq!(scan_class(&bytes, &filter()).unwrap(), *t);
}

#[test]
fn identical_tables_emit_identical_bytes() {
    let t = table(&[("R$styleable.x", 9)], &[("a", &[5, 6, 127, 128, 32_768])]).freeze();
    let (_keep, dir_a) = utf8_tempdir();
    let (_keep2, dir_b) = utf8_tempdir();
    let a = emit(&t, &dir_a, &EmitOptions::default()).unwrap();
    let b = emit(&t, &dir_b, &EmitOptions::default()).unwrap();
    assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
}

#[test]
fn empty_table_has_only_return() {
    let bytes = build_artifact(&SymbolTable::new().freeze(), &EmitOptions::default()).unwrap();
    let class = ClassFile::from_bytes(&bytes).unwrap();
    assert!(class.fields.is_empty());
    let clinit = class.clinit().unwrap();
    assert_eq!(class.decode_code(clinit).unwrap(), vec![Insn::Return]);
    assert!(scan_class(&bytes, &filter()).unwrap().is_empty());
}

#[test]
fn conflicting_inputs_name_the_key() {
    let left = build_artifact(&table(&[], &[("styleables.a", &[1, 2, 3])]).freeze(), &EmitOptions::default()).unwrap();
    let right = build_artifact(&table(&[], &[("styleables.a", &[1, 2, 4])]).freeze(), &EmitOptions::default()).unwrap();

    match scan(&[left, right], &filter(), &ScanOptions::default()) {
        Err(Error::Conflict { name, expected, actual }) => {
            assert_eq!(name, "styleables.a");
            assert_eq!(expected, ConstValue::Array(vec![1, 2, 3]));
            assert_eq!(actual, ConstValue::Array(vec![1, 2, 4]));
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
}

#[test]
fn consistent_inputs_merge_once() {
    let one = build_artifact(&table(&[], &[("styleables.a", &[1, 2, 3])]).freeze(), &EmitOptions::default()).unwrap();
    let merged = scan(&[one.clone(), one], &filter(), &ScanOptions::default()).unwrap();
    assert_eq!(merged.array_count(), 1);
    assert_eq!(merged.array("styleables.a"), Some(&[1, 2, 3][..]));
}

#[test]
fn parallel_scan_equals_sequential() {
    let inputs: Vec<Vec<u8>> = (0..40)
        .map(|i| {
            let name = format!("s{}", i % 9);
            let values = [i % 9, 100, 1_000, 100_000];
            build_artifact(&table(&[], &[(name.as_str(), &values)]).freeze(), &EmitOptions::default()).unwrap()
        })
        .collect();
    let seq = scan(&inputs, &filter(), &ScanOptions { parallel_threshold: usize::MAX }).unwrap();
    let par = scan(&inputs, &filter(), &ScanOptions { parallel_threshold: 1 }).unwrap();
    assert_eq!(seq, par);
    assert_eq!(seq.array_count(), 9);
}

#[test]
fn unrelated_instructions_are_skipped() {
    let mut cw = ClassWriter::new(
        "R$styleable",
        JAVA_LANG_OBJECT,
        AccessFlags::PUBLIC | AccessFlags::SUPER,
        50,
    )
    .unwrap();
    let field = cw.pool_mut().field_ref(&FieldRef::int_array("R$styleable", "a")).unwrap();
    let [hi, lo] = field.to_be_bytes();

    let mut code = vec![opcodes::ICONST_0 + 1, opcodes::NEWARRAY, opcodes::T_INT, opcodes::DUP, opcodes::ICONST_0];
    code.extend([opcodes::INVOKESTATIC, 0, 1]);
    code.extend([opcodes::WIDE, 0x15, 0, 4]);
    let pc = code.len();
    code.push(opcodes::TABLESWITCH);
    code.extend(std::iter::repeat(0).take(opcodes::switch_padding(pc)));
    code.extend(0_i32.to_be_bytes());
    code.extend(1_i32.to_be_bytes());
    code.extend(2_i32.to_be_bytes());
    code.extend([0; 8]);
    code.extend([opcodes::BIPUSH, 42, opcodes::IASTORE, opcodes::PUTSTATIC, hi, lo, opcodes::RETURN]);
    cw.raw_method(AccessFlags::STATIC, CLINIT, CLINIT_DESCRIPTOR, code, 4, 5).unwrap();
    let bytes = cw.to_bytes().unwrap();

    let decoded = scan_class(&bytes, &filter()).unwrap();
    assert_eq!(decoded.array("a"), Some(&[42][..]));
}

#[test]
fn run_merge_keeps_only_owned_scalars() {
    let (_keep, root) = utf8_tempdir();
    let input = root.join("in");
    let styleable = EmitOptions { class_name: "com/example/R$styleable".into(), ..EmitOptions::default() };
    emit(&table(&[("R$styleable.Theme_color", 0)], &[("Theme", &[0x7f01_0000])]).freeze(), &input, &styleable)
        .unwrap();

    let mut attr = ClassWriter::new(
        "com/example/R$attr",
        JAVA_LANG_OBJECT,
        AccessFlags::PUBLIC | AccessFlags::SUPER,
        50,
    )
    .unwrap();
    attr.field(AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL, "color", "I", Some(0x7f01_0000))
        .unwrap();
    std::fs::write(input.join("com/example/R$attr.class"), attr.to_bytes().unwrap()).unwrap();

    let out = root.join("out");
    let report = run_merge(&MergeOptions::new(vec![input], out.clone(), &Config::default())).unwrap();
    assert_eq!(report.inputs.len(), 2);
    assert_eq!(report.symbols, 2);
    assert_eq!(report.arrays, 1);

    let merged = scan_class(&std::fs::read(out.join("R$styleable.class")).unwrap(), &filter()).unwrap();
    assert_eq!(merged, table(&[("R$styleable.Theme_color", 0)], &[("Theme", &[0x7f01_0000])]));
}

#[test]
fn run_merge_over_directories() {
    let (_keep, root) = utf8_tempdir();
    let lib_a = root.join("lib-a/com/example/a");
    let lib_b = root.join("lib-b/com/example/b");
    emit(&table(&[], &[("Button", &[1, 2])]).freeze(), &lib_a, &EmitOptions::default()).unwrap();
    emit(&table(&[], &[("Button", &[1, 2]), ("Card", &[3])]).freeze(), &lib_b, &EmitOptions::default()).unwrap();
    std::fs::write(lib_a.join("BuildConfig.class"), b"not a class").unwrap();

    let out = root.join("out");
    let opts = MergeOptions::new(vec![root.join("lib-a"), root.join("lib-b")], out.clone(), &Config::default());
    let report = run_merge(&opts).unwrap();

    assert_eq!(report.inputs.len(), 2);
    assert_eq!(report.arrays, 2);
    assert_eq!(report.symbols, 0);
    assert_eq!(report.output, out.join("R$styleable.class").to_string());

    let merged = scan_class(&std::fs::read(out.join("R$styleable.class")).unwrap(), &filter()).unwrap();
    let names: Vec<_> = merged.arrays().map(|(k, _)| k).collect();
    assert_eq!(names, vec!["Button", "Card"]);
}

#[test]
fn failed_merge_writes_nothing() {
    let (_keep, root) = utf8_tempdir();
    emit(&table(&[], &[("a", &[1])]).freeze(), &root.join("x"), &EmitOptions::default()).unwrap();
    emit(&table(&[], &[("a", &[2])]).freeze(), &root.join("y"), &EmitOptions::default()).unwrap();

    let out = root.join("out");
    let opts = MergeOptions::new(vec![root.join("x"), root.join("y")], out.clone(), &Config::default());
    let err = run_merge(&opts).unwrap_err();
    assert!(format!("{err:#}").contains("value of a mismatched"));
    assert!(!out.exists());
}

#[test]
fn malformed_clinit_writes_nothing() {
    let (_keep, root) = utf8_tempdir();
    let mut cw = ClassWriter::new(
        "R$styleable",
        JAVA_LANG_OBJECT,
        AccessFlags::PUBLIC | AccessFlags::SUPER,
        50,
    )
    .unwrap();
    let code = vec![opcodes::ICONST_0, opcodes::ICONST_0, opcodes::IASTORE, opcodes::RETURN];
    cw.raw_method(AccessFlags::STATIC, CLINIT, CLINIT_DESCRIPTOR, code, 2, 0).unwrap();
    let input = root.join("in");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("R$styleable.class"), cw.to_bytes().unwrap()).unwrap();

    let out = root.join("out");
    let err = run_merge(&MergeOptions::new(vec![input], out.clone(), &Config::default())).unwrap_err();
    assert!(err.chain().any(|e| matches!(e.downcast_ref::<Error>(), Some(Error::MalformedStream(_)))));
    assert!(!out.exists());
}

proptest! {
    #[test]
    fn emit_then_scan_is_identity(
        arrays in proptest::collection::vec(proptest::collection::vec(-128..=i32::MAX, 0..8), 1..5),
        scalars in proptest::collection::vec(-128..=i32::MAX, 1..4),
    ) {
        let mut t = SymbolTable::new();
        for (i, v) in scalars.iter().enumerate() {
            t.insert_symbol(&format!("R$styleable.s{i}"), *v).unwrap();
        }
        for (i, values) in arrays.into_iter().enumerate() {
            t.insert_array(&format!("a{i}"), values).unwrap();
        }
        let t = t.freeze();
        let bytes = build_artifact(&t, &EmitOptions::default()).unwrap();
        prop_assert_eq!(scan_class(&bytes, &filter()).unwrap(), (*t).clone());
    }
}
