mod common;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use common::{ACCOUNT, BANK, CLIENT, OTHER_ACCOUNT, OTHER_CLIENT, engine_with_db, item};
use engine::{
    CreateInvoiceCmd, EngineError, InvoiceListFilter, InvoiceStatus, UpdateInvoiceCmd,
    money::format_money,
};

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

fn consulting() -> CreateInvoiceCmd {
    CreateInvoiceCmd::new(ACCOUNT, CLIENT, vec![item("Consulting", "7", "300.00")], "10")
}

#[tokio::test]
async fn create_computes_totals_and_numbers_invoice() {
    let (engine, _db) = engine_with_db().await;

    let invoice = engine
        .create_invoice(consulting().bank_account_id(BANK).order_number(" PO-17 "))
        .await
        .unwrap();

    assert_eq!(invoice.number, "INV-000001");
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(format_money(invoice.subtotal), "2100.00");
    assert_eq!(format_money(invoice.tax), "210.00");
    assert_eq!(format_money(invoice.total), "2310.00");
    assert_eq!(invoice.order_number.as_deref(), Some("PO-17"));
    assert_eq!(invoice.items.len(), 1);

    let stored = engine.invoice(ACCOUNT, invoice.id).await.unwrap();
    assert_eq!(stored.number, invoice.number);
    assert_eq!(stored.total, invoice.total);
    assert_eq!(stored.items[0].amount, dec("2100.00"));
    assert_eq!(stored.bank_account_id.as_deref(), Some(BANK));
}

#[tokio::test]
async fn create_with_future_send_time_is_scheduled() {
    let (engine, _db) = engine_with_db().await;

    let invoice = engine
        .create_invoice(consulting().scheduled_at(Utc::now() + Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Scheduled);
}

#[tokio::test]
async fn client_total_is_checked_with_tolerance() {
    let (engine, _db) = engine_with_db().await;

    let accepted = engine
        .create_invoice(consulting().client_total("2310.02"))
        .await
        .unwrap();
    // The computed total is stored, never the submitted one.
    assert_eq!(format_money(accepted.total), "2310.00");

    let rejected = engine
        .create_invoice(consulting().client_total("2310.03"))
        .await;
    assert!(matches!(rejected, Err(EngineError::TotalMismatch(_))));

    let all = engine
        .list_invoices(ACCOUNT, &InvoiceListFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn failed_create_leaves_no_invoice_and_no_gap() {
    let (engine, _db) = engine_with_db().await;

    let missing_client = engine
        .create_invoice(CreateInvoiceCmd::new(
            ACCOUNT,
            "nobody",
            vec![item("Work", "1", "10")],
            "0",
        ))
        .await;
    assert!(matches!(missing_client, Err(EngineError::KeyNotFound(_))));

    let foreign_client = engine
        .create_invoice(CreateInvoiceCmd::new(
            ACCOUNT,
            OTHER_CLIENT,
            vec![item("Work", "1", "10")],
            "0",
        ))
        .await;
    assert!(matches!(foreign_client, Err(EngineError::KeyNotFound(_))));

    let invalid = engine
        .create_invoice(CreateInvoiceCmd::new(
            ACCOUNT,
            CLIENT,
            vec![item("Work", "abc", "10")],
            "0",
        ))
        .await;
    assert!(matches!(invalid, Err(EngineError::Validation(_))));

    let invoice = engine.create_invoice(consulting()).await.unwrap();
    assert_eq!(invoice.number, "INV-000001");
}

#[tokio::test]
async fn update_replaces_lines_and_recomputes() {
    let (engine, _db) = engine_with_db().await;
    let invoice = engine.create_invoice(consulting()).await.unwrap();

    let updated = engine
        .update_invoice(
            UpdateInvoiceCmd::new(ACCOUNT, invoice.id)
                .items(vec![item("Design", "2", "150.00"), item("Hosting", "1", "49.99")]),
        )
        .await
        .unwrap();
    assert_eq!(updated.items.len(), 2);
    assert_eq!(format_money(updated.subtotal), "349.99");
    assert_eq!(format_money(updated.tax), "35.00");
    assert_eq!(format_money(updated.total), "384.99");

    let stored = engine.invoice(ACCOUNT, invoice.id).await.unwrap();
    assert_eq!(stored.items.len(), 2);
    assert_eq!(stored.items[0].description, "Design");
    assert_eq!(stored.items[1].description, "Hosting");
    assert_eq!(stored.number, invoice.number);
}

#[tokio::test]
async fn tax_rate_alone_recomputes_from_stored_lines() {
    let (engine, _db) = engine_with_db().await;
    let invoice = engine.create_invoice(consulting()).await.unwrap();

    let updated = engine
        .update_invoice(UpdateInvoiceCmd::new(ACCOUNT, invoice.id).tax_rate("20"))
        .await
        .unwrap();
    assert_eq!(format_money(updated.subtotal), "2100.00");
    assert_eq!(format_money(updated.tax), "420.00");
    assert_eq!(format_money(updated.total), "2520.00");
}

#[tokio::test]
async fn invoice_number_is_immutable() {
    let (engine, _db) = engine_with_db().await;
    let invoice = engine.create_invoice(consulting()).await.unwrap();

    let same = engine
        .update_invoice(UpdateInvoiceCmd::new(ACCOUNT, invoice.id).number("INV-000001"))
        .await;
    assert!(same.is_ok());

    let changed = engine
        .update_invoice(UpdateInvoiceCmd::new(ACCOUNT, invoice.id).number("INV-999999"))
        .await;
    assert!(matches!(changed, Err(EngineError::ImmutableField(_))));
}

#[tokio::test]
async fn scheduling_follows_send_time() {
    let (engine, _db) = engine_with_db().await;
    let invoice = engine.create_invoice(consulting()).await.unwrap();

    let scheduled = engine
        .update_invoice(
            UpdateInvoiceCmd::new(ACCOUNT, invoice.id)
                .scheduled_at(Some(Utc::now() + Duration::days(1))),
        )
        .await
        .unwrap();
    assert_eq!(scheduled.status, InvoiceStatus::Scheduled);

    let sent_by_hand = engine
        .update_invoice(UpdateInvoiceCmd::new(ACCOUNT, invoice.id).status(InvoiceStatus::Sent))
        .await;
    assert!(matches!(
        sent_by_hand,
        Err(EngineError::InvalidTransition(_))
    ));

    let unscheduled = engine
        .update_invoice(UpdateInvoiceCmd::new(ACCOUNT, invoice.id).scheduled_at(None))
        .await
        .unwrap();
    assert_eq!(unscheduled.status, InvoiceStatus::Draft);
    assert!(unscheduled.scheduled_at.is_none());

    let sent = engine
        .update_invoice(UpdateInvoiceCmd::new(ACCOUNT, invoice.id).status(InvoiceStatus::Sent))
        .await
        .unwrap();
    assert_eq!(sent.status, InvoiceStatus::Sent);
    assert!(sent.sent_at.is_some());
}

#[tokio::test]
async fn invoices_of_other_accounts_are_not_found() {
    let (engine, _db) = engine_with_db().await;
    let invoice = engine.create_invoice(consulting()).await.unwrap();

    assert!(matches!(
        engine.invoice(OTHER_ACCOUNT, invoice.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.delete_invoice(OTHER_ACCOUNT, invoice.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn delete_removes_invoice_and_lines() {
    let (engine, db) = engine_with_db().await;
    let invoice = engine.create_invoice(consulting()).await.unwrap();

    engine.delete_invoice(ACCOUNT, invoice.id).await.unwrap();

    assert!(matches!(
        engine.invoice(ACCOUNT, invoice.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    use sea_orm::{ConnectionTrait, Statement};
    let row = db
        .query_one(Statement::from_sql_and_values(
            db.get_database_backend(),
            "SELECT COUNT(*) AS n FROM invoice_line_items WHERE invoice_id = ?",
            [invoice.id.to_string().into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let count: i64 = row.try_get("", "n").unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn list_filters_by_status_and_client() {
    let (engine, _db) = engine_with_db().await;
    let first = engine.create_invoice(consulting()).await.unwrap();
    engine
        .create_invoice(CreateInvoiceCmd::new(
            ACCOUNT,
            "client-2",
            vec![item("Audit", "1", "500")],
            "0",
        ))
        .await
        .unwrap();
    engine
        .update_invoice(UpdateInvoiceCmd::new(ACCOUNT, first.id).status(InvoiceStatus::Sent))
        .await
        .unwrap();

    let sent = engine
        .list_invoices(
            ACCOUNT,
            &InvoiceListFilter {
                status: Some(InvoiceStatus::Sent),
                ..InvoiceListFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, first.id);
    assert_eq!(sent[0].items.len(), 1);

    let for_client = engine
        .list_invoices(
            ACCOUNT,
            &InvoiceListFilter {
                client_id: Some("client-2".to_string()),
                ..InvoiceListFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(for_client.len(), 1);
    assert_eq!(for_client[0].client_id, "client-2");

    let other = engine
        .list_invoices(OTHER_ACCOUNT, &InvoiceListFilter::default())
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn bulk_create_reports_partial_success() {
    let (engine, _db) = engine_with_db().await;

    let cmds = (1..=5)
        .map(|n| {
            let quantity = if n == 3 { "-1" } else { "1" };
            CreateInvoiceCmd::new(
                ACCOUNT,
                CLIENT,
                vec![item(&format!("Retainer {n}"), quantity, "100")],
                "0",
            )
        })
        .collect();

    let report = engine.bulk_create_invoices(cmds).await.unwrap();
    assert_eq!(report.created(), 4);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.results[2].result,
        Err(EngineError::Validation(_))
    ));
    assert_eq!(report.results[2].index, 2);

    let numbers: Vec<String> = report
        .results
        .iter()
        .filter_map(|item| item.result.as_ref().ok())
        .map(|invoice| invoice.number.clone())
        .collect();
    assert_eq!(
        numbers,
        vec!["INV-000001", "INV-000002", "INV-000003", "INV-000004"]
    );

    let stored = engine
        .list_invoices(ACCOUNT, &InvoiceListFilter::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 4);
}

#[tokio::test]
async fn bulk_create_is_bounded() {
    let (engine, _db) = engine_with_db().await;

    let cmds = vec![consulting(); 101];
    assert!(matches!(
        engine.bulk_create_invoices(cmds).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.bulk_create_invoices(Vec::new()).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn issue_date_defaults_to_today() {
    let (engine, _db) = engine_with_db().await;
    let invoice = engine.create_invoice(consulting()).await.unwrap();
    assert_eq!(invoice.issue_date, Utc::now().date_naive());

    let dated = engine
        .create_invoice(consulting().issue_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()))
        .await
        .unwrap();
    assert_eq!(dated.issue_date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
}
