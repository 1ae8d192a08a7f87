// ==========================================
// 导入 API 测试
// ==========================================
// 覆盖: 响应信封 { success, data | error } 与状态码
// ==========================================

use order_ingest::api::ImportApi;
use order_ingest::config::config_keys;

use test_helpers::{create_test_db, set_config, write_csv, ORDER_HEADER};

#[tokio::test]
async fn test_upload_success_envelope() {
    let (_db, db_path) = create_test_db().unwrap();
    let (_dir, csv) = write_csv("orders.csv", &[ORDER_HEADER, "X1,45292,A1,2,50,,"]).unwrap();

    let api = ImportApi::new(db_path);
    let response = api.handle_upload(csv.to_str().unwrap(), None).await;

    assert!(response.success);
    assert_eq!(response.status_code, 200);

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["data"]["imported"], 1);
    assert_eq!(value["data"]["total"], 1);
    assert_eq!(value["data"]["errors"], 0);
    assert_eq!(value["data"]["validationErrors"], 0);
    assert!(value["data"]["errorDetails"].as_array().unwrap().is_empty());
    assert!(value.get("error").is_none());
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let (_db, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(db_path);

    let response = api.handle_upload("/nonexistent/orders.xlsx", None).await;
    assert!(!response.success);
    assert_eq!(response.status_code, 404);
    assert!(response.data.is_none());
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_bad_options_json_is_400() {
    let (_db, db_path) = create_test_db().unwrap();
    let (_dir, csv) = write_csv("orders.csv", &[ORDER_HEADER, "X1,2024-01-01,A1,,,,"]).unwrap();
    let api = ImportApi::new(db_path);

    let response = api
        .handle_upload(csv.to_str().unwrap(), Some("{updateExisting: nope"))
        .await;
    assert!(!response.success);
    assert_eq!(response.status_code, 400);
}

#[tokio::test]
async fn test_header_only_sheet_is_400() {
    let (_db, db_path) = create_test_db().unwrap();
    let (_dir, csv) = write_csv("orders.csv", &[ORDER_HEADER]).unwrap();
    let api = ImportApi::new(db_path);

    let response = api.handle_upload(csv.to_str().unwrap(), None).await;
    assert!(!response.success);
    assert_eq!(response.status_code, 400);
}

#[tokio::test]
async fn test_unsupported_extension_is_400() {
    let (_db, db_path) = create_test_db().unwrap();
    let (_dir, txt) = write_csv("orders.txt", &[ORDER_HEADER]).unwrap();
    let api = ImportApi::new(db_path);

    let response = api.handle_upload(txt.to_str().unwrap(), None).await;
    assert!(!response.success);
    assert_eq!(response.status_code, 400);
}

/// 错误明细按配置截断，计数保持精确
#[tokio::test]
async fn test_error_detail_cap_from_config() {
    let (_db, db_path) = create_test_db().unwrap();
    set_config(&db_path, config_keys::ERROR_DETAIL_CAP, "3");

    let mut lines = vec![ORDER_HEADER.to_string()];
    for i in 0..5 {
        lines.push(format!("B{},not-a-date,A{},1,1,,", i, i));
    }
    lines.push("G1,2024-03-03,A9,1,1,,".to_string());
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (_dir, csv) = write_csv("orders.csv", &refs).unwrap();

    let api = ImportApi::new(db_path);
    let result = api
        .import_orders(csv.to_str().unwrap(), None)
        .await
        .expect("导入不应中止");

    assert_eq!(result.validation_errors, 5);
    assert_eq!(result.imported, 1);
    assert_eq!(result.error_details.len(), 3);
    let rows: Vec<usize> = result.error_details.iter().map(|d| d.row).collect();
    assert_eq!(rows, vec![2, 3, 4]);
}

#[tokio::test]
async fn test_list_recent_batches() {
    let (_db, db_path) = create_test_db().unwrap();
    let (_dir, csv) = write_csv("orders.csv", &[ORDER_HEADER, "X1,2024-01-01,A1,,,,"]).unwrap();
    let api = ImportApi::new(db_path);

    api.import_orders(csv.to_str().unwrap(), Some(r#"{"skipDuplicates":true}"#))
        .await
        .unwrap();

    let batches = api.list_recent_batches(10).await.unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].file_name.as_deref(), Some("orders.csv"));
    assert_eq!(batches[0].total_rows, 1);
    assert!(batches[0]
        .options_json
        .as_deref()
        .unwrap_or("")
        .contains("skipDuplicates"));
}
