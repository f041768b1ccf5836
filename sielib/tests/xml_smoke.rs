use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sielib::{
    encoding::looks_like_xml,
    error::{LineError, SieError},
    formats::xml::SieXml,
    model::ObjectRef,
    read_document,
    traits::ReadFormat,
};
use std::io::Cursor;

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Sie xmlns="http://www.sie.se/sie5">
  <FileInfo>
    <SoftwareProduct name="Fortnox" version="3.1"/>
    <FileCreation time="2024-02-01T10:00:00Z" by="Kalle"/>
    <Company organizationId="556677-8899" name="Acme AB"/>
    <FiscalYears>
      <FiscalYear primary="true" start="2024-01" end="2024-12"/>
      <FiscalYear start="2023-01" end="2023-12"/>
    </FiscalYears>
  </FileInfo>
  <Accounts>
    <Account id="1910" name="Kassa" type="asset">
      <OpeningBalance month="2024-01" amount="1000.00"/>
      <ClosingBalance month="2024-12" amount="1500.00"/>
    </Account>
    <Account id="3001" name="Försäljning" type="income"/>
  </Accounts>
  <Dimensions>
    <Dimension id="1" name="Kostnadsställe">
      <Object id="100" name="Avdelning 100"/>
    </Dimension>
  </Dimensions>
  <Journal id="A" name="Huvudbok">
    <JournalEntry id="1" journalDate="2024-01-15" text="Försäljning &amp; moms">
      <LedgerEntry accountId="1910" amount="500.00"/>
      <LedgerEntry accountId="3001" amount="-500.00" ledgerDate="2024-01-16" text="Kontant">
        <ObjectReference dimId="1" objectId="100"/>
      </LedgerEntry>
    </JournalEntry>
  </Journal>
</Sie>
"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn sie5_maps_onto_document() {
    let doc = SieXml::read(Cursor::new(SAMPLE)).expect("read sie5");
    assert!(doc.errors.is_empty(), "{:?}", doc.errors);

    assert_eq!(doc.program_name.as_deref(), Some("Fortnox"));
    assert_eq!(doc.program_version.as_deref(), Some("3.1"));
    assert_eq!(doc.generated, Some(date(2024, 2, 1)));
    assert_eq!(doc.company_name.as_deref(), Some("Acme AB"));
    assert_eq!(doc.registration_number.as_deref(), Some("556677-8899"));

    let current = doc.booking_year(0).unwrap();
    assert_eq!((current.start, current.end), (date(2024, 1, 1), date(2024, 12, 31)));
    let previous = doc.booking_year(-1).unwrap();
    assert_eq!(previous.start, date(2023, 1, 1));

    let cash = doc.account("1910").unwrap();
    assert_eq!(cash.name, "Kassa");
    assert_eq!(cash.account_type.as_deref(), Some("asset"));
    assert_eq!(cash.opening_balance, dec!(1000.00));
    assert_eq!(cash.closing_balance, dec!(1500.00));
    assert_eq!(doc.account("3001").unwrap().name, "Försäljning");

    let obj = doc.object(&ObjectRef::new("1", "100")).unwrap();
    assert_eq!(obj.name, "Avdelning 100");
}

#[test]
fn sie5_journal_entries() {
    let doc = SieXml::read(Cursor::new(SAMPLE)).expect("read sie5");
    assert_eq!(doc.vouchers.len(), 1);

    let v = &doc.vouchers[0];
    assert_eq!(v.series, "A");
    assert_eq!(v.number, "1");
    assert_eq!(v.date, date(2024, 1, 15));
    assert_eq!(v.text, "Försäljning & moms");
    assert_eq!(v.rows.len(), 2);
    assert_eq!(v.rows[0].transaction_date, v.date);
    assert_eq!(v.rows[1].transaction_date, date(2024, 1, 16));
    assert_eq!(v.rows[1].objects, vec![ObjectRef::new("1", "100")]);
    assert_eq!(v.rows[1].text, "Kontant");
    assert_eq!(v.balance(), Decimal::ZERO);
}

#[test]
fn bad_attribute_skips_element() {
    let input = r#"<?xml version="1.0"?>
<Sie>
  <Journal id="B">
    <JournalEntry id="1" journalDate="not-a-date">
      <LedgerEntry accountId="1910" amount="1.00"/>
    </JournalEntry>
    <JournalEntry id="2" journalDate="2024-03-01">
      <LedgerEntry accountId="1910" amount="abc"/>
      <LedgerEntry accountId="1910" amount="2.00"/>
    </JournalEntry>
  </Journal>
</Sie>
"#;
    let doc = SieXml::read(Cursor::new(input)).expect("read sie5");
    let kinds: Vec<_> = doc.errors.iter().map(|e| e.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            LineError::InvalidDate("not-a-date".into()),
            LineError::InvalidNumber("abc".into()),
        ]
    );
    assert_eq!(doc.errors[0].text, "JournalEntry");
    assert_eq!(doc.errors[0].line, 4);

    assert_eq!(doc.vouchers.len(), 1);
    assert_eq!(doc.vouchers[0].number, "2");
    assert_eq!(doc.vouchers[0].rows.len(), 1);
}

#[test]
fn malformed_xml_is_fatal() {
    let input = "<?xml version=\"1.0\"?>\n<Sie><Accounts><Account id=\"1\"></Accounts></Sie>";
    match SieXml::read(Cursor::new(input)) {
        Err(SieError::Xml(_)) => {}
        other => panic!("expected XML error, got {other:?}"),
    }
}

#[test]
fn dialect_is_sniffed_from_content() {
    assert!(looks_like_xml(b"\xEF\xBB\xBF  \n<?xml version=\"1.0\"?><Sie/>"));
    assert!(!looks_like_xml(b"#FLAGGA 0\n"));
    assert!(!looks_like_xml(b""));

    let mut bytes = b"\n\n".to_vec();
    bytes.extend_from_slice(SAMPLE.as_bytes());
    let doc = read_document(Cursor::new(bytes)).expect("read xml");
    assert_eq!(doc.vouchers.len(), 1);
    assert_eq!(doc.company_name.as_deref(), Some("Acme AB"));

    let doc = read_document(Cursor::new("#FNAMN Acme\n#KONTO 1910 Kassa\n")).expect("read sie");
    assert_eq!(doc.company_name.as_deref(), Some("Acme"));
    assert_eq!(doc.accounts.len(), 1);
}
