//! Структурное сравнение двух документов для проверки round-trip.
//!
//! Проверяются только поля, которые обязаны пережить запись и повторное
//! чтение: формат, компания, счета, шапки верификаций. Возвращаются все
//! расхождения по порядку; пустой список — документы совпадают.

use crate::model::{Document, Voucher};
use std::fmt::Display;

pub fn compare(a: &Document, b: &Document) -> Vec<String> {
    let mut errors = Vec::new();

    diff_opt(&mut errors, "Format", &a.format, &b.format);
    diff_opt(&mut errors, "CompanyName", &a.company_name, &b.company_name);

    if a.accounts.len() != b.accounts.len() {
        errors.push(format!(
            "Account count differs: {} vs {}",
            a.accounts.len(),
            b.accounts.len()
        ));
    }
    for acc in a.accounts.values() {
        let Some(other) = b.account(&acc.number) else {
            errors.push(format!("Account {} not found in B", acc.number));
            continue;
        };
        diff(
            &mut errors,
            &format!("Account {} Name", acc.number),
            &acc.name,
            &other.name,
        );
    }

    if a.vouchers.len() != b.vouchers.len() {
        errors.push(format!(
            "Voucher count differs: {} vs {}",
            a.vouchers.len(),
            b.vouchers.len()
        ));
        // позиционное соответствие потеряно
        return errors;
    }
    for (va, vb) in by_date(a).into_iter().zip(by_date(b)) {
        let ctx = format!("Voucher {}{}", va.series, va.number);
        diff(&mut errors, &format!("{ctx} VoucherSeries"), &va.series, &vb.series);
        diff(&mut errors, &format!("{ctx} VoucherNumber"), &va.number, &vb.number);
        diff(&mut errors, &format!("{ctx} VoucherDate"), &va.date, &vb.date);
        diff(&mut errors, &format!("{ctx} VoucherText"), &va.text, &vb.text);
    }
    errors
}

/// Тот же стабильный порядок, в котором пишет writer.
fn by_date(doc: &Document) -> Vec<&Voucher> {
    let mut v: Vec<&Voucher> = doc.vouchers.iter().collect();
    v.sort_by_key(|v| v.date);
    v
}

fn diff<T: PartialEq + Display + ?Sized>(errors: &mut Vec<String>, field: &str, a: &T, b: &T) {
    if a != b {
        errors.push(format!("{field} differs: '{a}' vs '{b}'"));
    }
}

fn diff_opt(errors: &mut Vec<String>, field: &str, a: &Option<String>, b: &Option<String>) {
    if a != b {
        errors.push(format!(
            "{field} differs: '{}' vs '{}'",
            a.as_deref().unwrap_or(""),
            b.as_deref().unwrap_or("")
        ));
    }
}
