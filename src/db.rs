#![allow(dead_code)]

use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, ExecResult, QueryResult,
    Statement, Value,
};
use std::path::Path;
use tokio::fs;

use crate::info;

// 建表脚本随二进制打包，启动时重复执行是安全的 (CREATE TABLE IF NOT EXISTS)
const SCHEMA: &str = include_str!("../res/schema.sql");

/// 初始化数据库连接并应用表结构
pub async fn init() -> Result<DatabaseConnection, DbErr> {
    if !Path::new("data").exists() {
        let _ = fs::create_dir("data").await;
    }

    // mode=rwc 允许 读/写/创建
    let db_url = "sqlite:data/bftool.db?mode=rwc";

    let db = Database::connect(db_url).await?;
    apply_schema(&db).await?;

    info!(target: "Database", "连接成功: {}", db_url);

    Ok(db)
}

/// 应用建表脚本，逐条执行
pub async fn apply_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    for stmt in SCHEMA.split(';') {
        let stmt = stmt.trim();
        if stmt.is_empty() || stmt.lines().all(|l| l.trim_start().starts_with("--")) {
            continue;
        }
        db.execute_unprepared(stmt).await?;
    }
    Ok(())
}

/// 执行写语句（单条语句自动提交；失败直接上抛）
pub async fn execute(
    db: &DatabaseConnection,
    sql: &str,
    values: Vec<Value>,
) -> Result<ExecResult, DbErr> {
    db.execute(Statement::from_sql_and_values(DbBackend::Sqlite, sql, values))
        .await
}

/// 查询至多一行
pub async fn query_one(
    db: &DatabaseConnection,
    sql: &str,
    values: Vec<Value>,
) -> Result<Option<QueryResult>, DbErr> {
    db.query_one(Statement::from_sql_and_values(DbBackend::Sqlite, sql, values))
        .await
}

/// 查询全部匹配行
pub async fn query_all(
    db: &DatabaseConnection,
    sql: &str,
    values: Vec<Value>,
) -> Result<Vec<QueryResult>, DbErr> {
    db.query_all(Statement::from_sql_and_values(DbBackend::Sqlite, sql, values))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> DatabaseConnection {
        Database::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let db = memory_db().await;
        apply_schema(&db).await.unwrap();
        // 重复执行不得报错
        apply_schema(&db).await.unwrap();

        let rows = query_all(&db, "SELECT * FROM binding", vec![]).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn execute_and_query_round_trip() {
        let db = memory_db().await;
        apply_schema(&db).await.unwrap();

        execute(
            &db,
            "INSERT INTO binding (qq_id, ea_name, ea_id) VALUES (?, ?, ?)",
            vec!["1".into(), "Alice".into(), "eaid1".into()],
        )
        .await
        .unwrap();

        let row = query_one(
            &db,
            "SELECT * FROM binding WHERE qq_id = ?",
            vec!["1".into()],
        )
        .await
        .unwrap()
        .unwrap();
        let name: String = row.try_get("", "ea_name").unwrap();
        assert_eq!(name, "Alice");

        let none = query_one(
            &db,
            "SELECT * FROM binding WHERE qq_id = ?",
            vec!["2".into()],
        )
        .await
        .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn execute_surfaces_storage_errors() {
        let db = memory_db().await;
        apply_schema(&db).await.unwrap();

        let err = execute(&db, "INSERT INTO no_such_table VALUES (1)", vec![]).await;
        assert!(err.is_err());
    }
}
