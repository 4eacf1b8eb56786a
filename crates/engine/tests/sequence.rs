mod common;

use std::collections::HashSet;

use common::{ACCOUNT, CLIENT, OTHER_ACCOUNT, engine_with_db, item};
use engine::{BillingPolicy, CreateInvoiceCmd, Engine};

#[tokio::test]
async fn numbers_are_formatted_and_consecutive() {
    let (engine, _db) = engine_with_db().await;

    assert_eq!(engine.next_invoice_number(ACCOUNT).await.unwrap(), "INV-000001");
    assert_eq!(engine.next_invoice_number(ACCOUNT).await.unwrap(), "INV-000002");

    let invoice = engine
        .create_invoice(CreateInvoiceCmd::new(
            ACCOUNT,
            CLIENT,
            vec![item("Support", "1", "80")],
            "0",
        ))
        .await
        .unwrap();
    assert_eq!(invoice.number, "INV-000003");
}

#[tokio::test]
async fn accounts_have_independent_sequences() {
    let (engine, _db) = engine_with_db().await;

    assert_eq!(engine.next_invoice_number(ACCOUNT).await.unwrap(), "INV-000001");
    assert_eq!(engine.next_invoice_number(ACCOUNT).await.unwrap(), "INV-000002");
    assert_eq!(
        engine.next_invoice_number(OTHER_ACCOUNT).await.unwrap(),
        "INV-000001"
    );
}

#[tokio::test]
async fn concurrent_callers_get_distinct_numbers_without_gaps() {
    let (engine, _db) = engine_with_db().await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine: Engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.next_invoice_number(ACCOUNT).await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let number = handle.await.unwrap().unwrap();
        assert!(numbers.insert(number), "number issued twice");
    }
    let expected: HashSet<String> = (1..=20).map(|n| format!("INV-{n:06}")).collect();
    assert_eq!(numbers, expected);
}

#[tokio::test]
async fn concurrent_creates_get_distinct_numbers() {
    let (engine, _db) = engine_with_db().await;

    let mut handles = Vec::new();
    for n in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_invoice(CreateInvoiceCmd::new(
                    ACCOUNT,
                    CLIENT,
                    vec![item(&format!("Sprint {n}"), "1", "1000")],
                    "0",
                ))
                .await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let invoice = handle.await.unwrap().unwrap();
        assert!(numbers.insert(invoice.number));
    }
    assert_eq!(numbers.len(), 10);
    assert!(numbers.contains("INV-000001"));
    assert!(numbers.contains("INV-000010"));
}

#[tokio::test]
async fn policy_controls_number_format() {
    let (_engine, db) = engine_with_db().await;
    let engine = Engine::builder()
        .database(db)
        .policy(BillingPolicy {
            invoice_prefix: "ACME/".to_string(),
            number_width: 4,
            ..BillingPolicy::default()
        })
        .build()
        .await
        .unwrap();

    assert_eq!(engine.next_invoice_number(ACCOUNT).await.unwrap(), "ACME/0001");
}
