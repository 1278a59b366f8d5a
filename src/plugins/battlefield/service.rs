use sea_orm::{DatabaseConnection, DbErr, FromQueryResult};

use crate::db;

/// 用户绑定行
#[derive(Debug, Clone, FromQueryResult)]
pub struct UserBinding {
    pub qq_id: String,
    pub ea_name: String,
    pub ea_id: String,
}

/// 会话渠道默认游戏行
#[derive(Debug, Clone, FromQueryResult)]
pub struct ChannelSetting {
    pub channel_id: String,
    pub default_game_tag: String,
}

/// 更新或插入用户绑定，返回面向用户的结果文案。
/// 先读后写并非原子操作：键按 QQ 号隔离，此规模下无竞争问题。
pub async fn upsert_user_binding(
    db: &DatabaseConnection,
    qq_id: &str,
    ea_name: &str,
    ea_id: &str,
) -> Result<String, DbErr> {
    let old = query_user_binding(db, qq_id).await?;

    db::execute(
        db,
        "INSERT INTO binding (qq_id, ea_name, ea_id) VALUES (?, ?, ?) \
         ON CONFLICT(qq_id) DO UPDATE SET ea_name = excluded.ea_name, ea_id = excluded.ea_id",
        vec![qq_id.into(), ea_name.into(), ea_id.into()],
    )
    .await?;

    Ok(match old {
        Some(prev) => format!("更新绑定数据: {}-->{}", prev.ea_name, ea_name),
        None => format!("成功绑定EA_NAME：{}", ea_name),
    })
}

/// 更新或插入会话渠道的默认游戏
pub async fn upsert_channel_setting(
    db: &DatabaseConnection,
    channel_id: &str,
    game_tag: &str,
) -> Result<String, DbErr> {
    let old = query_channel_setting(db, channel_id).await?;

    db::execute(
        db,
        "INSERT INTO channel_setting (channel_id, default_game_tag) VALUES (?, ?) \
         ON CONFLICT(channel_id) DO UPDATE SET default_game_tag = excluded.default_game_tag",
        vec![channel_id.into(), game_tag.into()],
    )
    .await?;

    Ok(match old {
        Some(prev) => format!("更新渠道数据: {}-->{}", prev.default_game_tag, game_tag),
        None => format!("成功绑定DEFAULT_GAME_TAG：{}", game_tag),
    })
}

/// 查询绑定用户
pub async fn query_user_binding(
    db: &DatabaseConnection,
    qq_id: &str,
) -> Result<Option<UserBinding>, DbErr> {
    let row = db::query_one(
        db,
        "SELECT qq_id, ea_name, ea_id FROM binding WHERE qq_id = ?",
        vec![qq_id.into()],
    )
    .await?;
    row.map(|r| UserBinding::from_query_result(&r, "")).transpose()
}

/// 查询会话渠道设置
pub async fn query_channel_setting(
    db: &DatabaseConnection,
    channel_id: &str,
) -> Result<Option<ChannelSetting>, DbErr> {
    let row = db::query_one(
        db,
        "SELECT channel_id, default_game_tag FROM channel_setting WHERE channel_id = ?",
        vec![channel_id.into()],
    )
    .await?;
    row.map(|r| ChannelSetting::from_query_result(&r, ""))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    async fn memory_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db::apply_schema(&db).await.unwrap();
        db
    }

    #[tokio::test]
    async fn first_bind_reports_creation() {
        let db = memory_db().await;
        let msg = upsert_user_binding(&db, "123", "Alice", "eaid1").await.unwrap();
        assert_eq!(msg, "成功绑定EA_NAME：Alice");

        let row = query_user_binding(&db, "123").await.unwrap().unwrap();
        assert_eq!(row.ea_name, "Alice");
        assert_eq!(row.ea_id, "eaid1");
    }

    #[tokio::test]
    async fn rebind_reports_old_and_new_name() {
        let db = memory_db().await;
        upsert_user_binding(&db, "123", "Alice", "eaid1").await.unwrap();
        let msg = upsert_user_binding(&db, "123", "Bob", "eaid2").await.unwrap();
        assert_eq!(msg, "更新绑定数据: Alice-->Bob");

        // 每个键至多一行，且为最新值
        let row = query_user_binding(&db, "123").await.unwrap().unwrap();
        assert_eq!(row.ea_name, "Bob");
        assert_eq!(row.ea_id, "eaid2");
        let all = db::query_all(&db, "SELECT qq_id FROM binding", vec![]).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn bindings_are_isolated_per_user() {
        let db = memory_db().await;
        upsert_user_binding(&db, "1", "Alice", "a").await.unwrap();
        upsert_user_binding(&db, "2", "Bob", "b").await.unwrap();

        assert_eq!(
            query_user_binding(&db, "1").await.unwrap().unwrap().ea_name,
            "Alice"
        );
        assert_eq!(
            query_user_binding(&db, "2").await.unwrap().unwrap().ea_name,
            "Bob"
        );
    }

    #[tokio::test]
    async fn missing_binding_is_none() {
        let db = memory_db().await;
        assert!(query_user_binding(&db, "404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn channel_setting_upsert_round_trip() {
        let db = memory_db().await;
        let msg = upsert_channel_setting(&db, "g100", "bf1").await.unwrap();
        assert_eq!(msg, "成功绑定DEFAULT_GAME_TAG：bf1");

        let msg = upsert_channel_setting(&db, "g100", "bfv").await.unwrap();
        assert_eq!(msg, "更新渠道数据: bf1-->bfv");

        let row = query_channel_setting(&db, "g100").await.unwrap().unwrap();
        assert_eq!(row.default_game_tag, "bfv");
        assert!(query_channel_setting(&db, "g999").await.unwrap().is_none());
    }
}
