use std::time::Duration;

use l402::executor::{InvoiceIssuer, PayInvoiceRequest, PaymentExecutor, PaymentOutcome, TestInvoiceRequest};
use l402::{ExecutorError, Invoice, MilliSatoshis, NodeConfig};
use l402_http::HttpPaymentExecutor;
use l402_http::executor::ExecutorConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// base64("client:secret")
const BASIC_AUTH: &str = "Basic Y2xpZW50OnNlY3JldA==";

fn executor(server: &MockServer) -> HttpPaymentExecutor {
    let node = NodeConfig::new("client", "secret", "node-1", "hunter2").unwrap();
    HttpPaymentExecutor::new(ExecutorConfig::for_node(server.uri(), &node)).unwrap()
}

fn pay_request() -> PayInvoiceRequest {
    PayInvoiceRequest {
        node_id: "node-1".into(),
        invoice: Invoice::parse("lnbc1500n1pjtestinvoice").unwrap(),
        timeout: Duration::from_secs(60),
        maximum_fee: MilliSatoshis(1000),
        amount: None,
    }
}

#[tokio::test]
async fn test_pay_sends_credentials_and_limits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_partial_json(json!({
            "node_id": "node-1",
            "encoded_invoice": "lnbc1500n1pjtestinvoice",
            "timeout_secs": 60,
            "maximum_fees_msats": 1000,
            "node_password": "hunter2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "OutgoingPayment:0191",
            "status": "SUCCESS"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = executor(&server).pay(&pay_request()).await.unwrap();
    assert_eq!(
        outcome,
        PaymentOutcome::Succeeded {
            payment_id: "OutgoingPayment:0191".into()
        }
    );
}

#[tokio::test]
async fn test_pay_reports_failure_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "OutgoingPayment:0192",
            "status": "FAILED",
            "failure_reason": "ROUTE_NOT_FOUND"
        })))
        .mount(&server)
        .await;

    let outcome = executor(&server).pay(&pay_request()).await.unwrap();
    assert_eq!(
        outcome,
        PaymentOutcome::Failed {
            reason: "ROUTE_NOT_FOUND".into()
        }
    );
}

#[tokio::test]
async fn test_pay_rejected_by_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let err = executor(&server).pay(&pay_request()).await.unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::Rejected { status: 401, ref message } if message == "bad credentials"
    ));
}

#[tokio::test]
async fn test_create_test_invoice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoices/test"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_partial_json(json!({
            "node_id": "node-1",
            "amount_msats": 50000,
            "memo": "Test Payment"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "encoded_payment_request": "lntb500n1ptestmode"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let invoice = executor(&server)
        .create_test_invoice(&TestInvoiceRequest {
            node_id: "node-1".into(),
            amount: MilliSatoshis(50_000),
            memo: Some("Test Payment".into()),
        })
        .await
        .unwrap();
    assert_eq!(invoice.as_str(), "lntb500n1ptestmode");
}
