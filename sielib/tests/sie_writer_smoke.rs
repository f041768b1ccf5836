use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sielib::{
    compare,
    formats::sie::{format_objects, parse_str, to_string, WriteOptions},
    model::{Account, Document, ObjectRef, Voucher, VoucherRow},
};

fn opts() -> WriteOptions {
    WriteOptions {
        program_name: "sielib tests".into(),
        program_version: "1.0".into(),
        generated: NaiveDate::from_ymd_opt(2024, 3, 1),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn account_names_are_quoted_only_when_needed() {
    let mut doc = Document::default();
    for a in [
        Account::new("1910", "Cash"),
        Account::new("2440", "Accounts Payable"),
        Account::new("3000", r#"Say "hi""#),
        Account::new("3999", ""),
    ] {
        doc.accounts.insert(a.number.clone(), a);
    }

    let s = to_string(&doc, &opts());
    assert!(s.contains("#KONTO 1910 Cash\n"));
    assert!(s.contains("#KONTO 2440 \"Accounts Payable\"\n"));
    assert!(s.contains("#KONTO 3000 \"Say \\\"hi\\\"\"\n"));
    assert!(s.contains("#KONTO 3999 \"\"\n"));

    let back = parse_str(&s);
    assert!(back.errors.is_empty(), "{:?}", back.errors);
    assert_eq!(back.account("3000").unwrap().name, r#"Say "hi""#);
    assert_eq!(back.account("3999").unwrap().name, "");
}

#[test]
fn header_is_deterministic() {
    let mut doc = Document::default();
    doc.format = Some("PC8".into());
    doc.company_name = Some("Acme AB".into());
    doc.registration_number = Some("556677-8899".into());

    let s = to_string(&doc, &opts());
    let head: Vec<&str> = s.lines().take(7).collect();
    assert_eq!(
        head,
        vec![
            "#FLAGGA 0",
            "#PROGRAM \"sielib tests\" 1.0",
            "#FORMAT PC8",
            "#GEN 20240301",
            "#SIETYP 4",
            "#FNAMN \"Acme AB\"",
            "#ORGNR 556677-8899",
        ]
    );
}

#[test]
fn absent_optional_header_fields_are_not_written() {
    let mut doc = Document::default();
    doc.registration_number = Some(String::new());
    let s = to_string(&doc, &opts());
    assert!(!s.contains("#FORMAT"));
    assert!(!s.contains("#FNAMN"));
    assert!(!s.contains("#ORGNR"));
    assert!(s.contains("#SIETYP 4\n"));
}

#[test]
fn sections_follow_canonical_order() {
    let input = r#"#VER A 1 20240101 Opening
{
#TRANS 1910 {} 100.00
#TRANS 2440 {} -100.00
}
#PSALDO 0 202401 1910 {} 100.00
#UB 0 1910 100.00
#IB 0 1910 50.00
#OBJEKT 1 100 Avd
#DIM 1 Kst
#SRU 1910 7281
#KTYP 1910 T
#KONTO 2440 Skulder
#KONTO 1910 Kassa
#RAR 0 20240101 20241231
#FNAMN Acme
"#;
    let doc = parse_str(input);
    // #OBJEKT до #DIM и #KTYP/#SRU/#IB/#UB/#PSALDO до #KONTO теряются при чтении
    assert_eq!(doc.errors.len(), 0);

    let s = to_string(&doc, &opts());
    let order = ["#FNAMN", "#RAR", "#KONTO 1910", "#KONTO 2440", "#DIM", "#VER"];
    let positions: Vec<usize> = order
        .iter()
        .map(|tag| s.find(&format!("\n{tag} ")).unwrap_or_else(|| panic!("{tag} missing")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{s}");
}

#[test]
fn full_body_order() {
    let input = "#FNAMN Acme\n#RAR 0 20240101 20241231\n#KONTO 1910 Kassa\n#KTYP 1910 T\n#ENHET 1910 st\n#SRU 1910 7281\n#DIM 1 Kst\n#OBJEKT 1 100 Avd\n#IB 0 1910 50.00\n#UB 0 1910 150.00\n#RES 0 1910 10.00\n#PSALDO 0 202401 1910 {} 100.00\n#VER A 1 20240101\n{\n#TRANS 1910 {} 100.00\n}\n";
    let doc = parse_str(input);
    assert!(doc.errors.is_empty(), "{:?}", doc.errors);

    let s = to_string(&doc, &opts());
    let tags: Vec<&str> = s
        .lines()
        .skip(4)
        .filter_map(|l| l.split_whitespace().next())
        .collect();
    assert_eq!(
        tags,
        vec![
            "#FNAMN", "#RAR", "#KONTO", "#KTYP", "#ENHET", "#SRU", "#DIM", "#OBJEKT", "#IB",
            "#UB", "#RES", "#PSALDO", "#VER", "{", "#TRANS", "}",
        ]
    );
    assert!(s.contains("#PSALDO 0 202401 1910 {} 100.00\n"));
    assert!(s.contains("#OBJEKT 1 100 Avd\n"));
}

#[test]
fn vouchers_are_written_by_date() {
    let mut doc = Document::default();
    let mut late = Voucher::new("A", "1", date(2024, 1, 5));
    late.rows.push(VoucherRow {
        account: "1910".into(),
        objects: vec![ObjectRef::new("1", "100")],
        amount: dec!(500.00),
        transaction_date: date(2024, 1, 5),
        text: String::new(),
        quantity: None,
        registration_sign: None,
    });
    doc.vouchers.push(late);
    doc.vouchers.push(Voucher::new("A", "2", date(2024, 1, 1)));

    let s = to_string(&doc, &opts());
    let first = s.find("#VER A 2 20240101").unwrap();
    let second = s.find("#VER A 1 20240105").unwrap();
    assert!(first < second);
    assert!(s.contains("#TRANS 1910 {1 \"100\"} 500.00 20240105 \"\"\n"));
}

#[test]
fn row_quantity_and_sign() {
    let mut doc = Document::default();
    let mut v = Voucher::new("B", "3", date(2024, 2, 1));
    v.registration_sign = Some("KA".into());
    v.rows.push(VoucherRow {
        account: "4010".into(),
        objects: vec![],
        amount: dec!(-12.5),
        transaction_date: date(2024, 2, 1),
        text: "Kaffe".into(),
        quantity: None,
        registration_sign: Some("KA".into()),
    });
    doc.vouchers.push(v);

    let s = to_string(&doc, &opts());
    assert!(s.contains("#VER B 3 20240201 \"\" \"\" KA\n"));
    assert!(s.contains("#TRANS 4010 {} -12.5 20240201 Kaffe \"\" KA\n"));

    let back = parse_str(&s);
    assert!(back.errors.is_empty(), "{:?}", back.errors);
    assert_eq!(back.vouchers[0].registration_sign.as_deref(), Some("KA"));
    assert_eq!(back.vouchers[0].registration_date, None);
    assert_eq!(back.vouchers[0].rows[0].registration_sign.as_deref(), Some("KA"));
    assert_eq!(back.vouchers[0].rows[0].quantity, None);
}

#[test]
fn backslashes_survive_a_rewrite() {
    let doc = parse_str("#FORMAT PC8\n#KONTO 1910 C:\\\n#KONTO 1920 \"Path C:\\\\temp\\\\ \\\"x\\\"\"\n");
    assert!(doc.errors.is_empty(), "{:?}", doc.errors);
    assert_eq!(doc.account("1910").unwrap().name, r"C:\");
    assert_eq!(doc.account("1920").unwrap().name, r#"Path C:\temp\ "x""#);

    let s = to_string(&doc, &opts());
    assert!(s.contains(r#"#KONTO 1910 "C:\\""#), "{s}");
    assert!(s.contains(r#"#KONTO 1920 "Path C:\\temp\\ \"x\"""#), "{s}");

    let back = parse_str(&s);
    assert!(back.errors.is_empty(), "{:?}", back.errors);
    assert_eq!(compare(&doc, &back), Vec::<String>::new());
    assert_eq!(back.account("1910").unwrap().name, r"C:\");
}

#[test]
fn object_lists_quote_dimensions_when_needed() {
    let objects = vec![
        ObjectRef::new("", "x"),
        ObjectRef::new("1", r"a\b"),
        ObjectRef::new("2", "200"),
    ];
    assert_eq!(format_objects(&objects), r#"{"" "x" 1 "a\\b" 2 "200"}"#);

    let mut doc = Document::default();
    let mut v = Voucher::new("A", "1", date(2024, 1, 1));
    v.rows.push(VoucherRow {
        account: "1910".into(),
        objects: objects.clone(),
        amount: dec!(1.00),
        transaction_date: date(2024, 1, 1),
        text: String::new(),
        quantity: None,
        registration_sign: None,
    });
    doc.vouchers.push(v);

    let back = parse_str(&to_string(&doc, &opts()));
    assert!(back.errors.is_empty(), "{:?}", back.errors);
    assert_eq!(back.vouchers[0].rows[0].objects, objects);
}

#[test]
fn period_value_year_index_is_written_back() {
    let doc = parse_str("#KONTO 1910 Kassa\n#PSALDO -1 202301 1910 {} 77.00\n#PSALDO 0 202401 1910 {} 12.00\n");
    let s = to_string(&doc, &opts());
    assert!(s.contains("#PSALDO -1 202301 1910 {} 77.00\n"), "{s}");
    assert!(s.contains("#PSALDO 0 202401 1910 {} 12.00\n"), "{s}");
}
