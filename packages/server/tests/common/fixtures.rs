//! Request bodies and records shared by the integration tests.

use contract_core::domains::contracts::{Contract, ContractId, ContractStatus, ContractStore};
use serde_json::{json, Value};

pub const BOUNDARY: &str = "contract-test-boundary";

/// Minimal bytes that pass the PDF magic check
pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

/// multipart/form-data body with a single `file` field
pub fn multipart_file(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// multipart/form-data body with only a text field
pub fn multipart_without_file() -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = BOUNDARY
    )
    .into_bytes()
}

/// Insert a contract that is already Processing with a known job id
pub fn processing_contract(store: &ContractStore, tenant: &str, job_id: &str) -> ContractId {
    let id = ContractId::new();
    store
        .create(Contract::new(
            id,
            tenant,
            "lease.pdf",
            format!("https://storage.test/{}/{}/lease.pdf", tenant, id),
        ))
        .expect("fresh id");
    store.update_status(&id, ContractStatus::Processing, None);
    store.attach_job(&id, job_id);
    id
}

/// Webhook body as MinerU sends it: content is a JSON document in a string
pub fn callback_body(content: Value) -> Value {
    json!({
        "checksum": "0000",
        "content": content.to_string(),
    })
}
