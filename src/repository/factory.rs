//! Worker registry: factories and their registered inventory.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::format_datetime;
use super::models::{
    BrowserRecord, ColorDepthRecord, FactoryRecord, NewBrowserRecord, NewColorDepthRecord,
    NewFactoryRecord, NewScreenSizeRecord, ScreenSizeRecord,
};
use super::pool::{DbError, DbPool};
use crate::models::{Browser, ColorDepth, Factory, Inventory, NewBrowser, NewFactory, ScreenSize};
use crate::schema::{factories, factory_browsers, factory_color_depths, factory_screen_sizes};
use crate::{with_conn, with_conn_split};

/// Diesel-based factory repository.
#[derive(Clone)]
pub struct DieselFactoryRepository {
    pool: DbPool,
}

impl DieselFactoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a new factory.
    pub async fn create(&self, factory: &NewFactory, now: DateTime<Utc>) -> Result<Factory, DbError> {
        let created_at = format_datetime(now);
        let record = NewFactoryRecord {
            name: &factory.name,
            operating_system: &factory.operating_system,
            password_hash: factory.password_hash.as_deref(),
            created_at: &created_at,
        };

        with_conn!(self.pool, conn => {
            diesel::insert_into(factories::table)
                .values(&record)
                .returning(FactoryRecord::as_returning())
                .get_result(&mut conn)
                .await
                .map(Factory::from)
        })
    }

    pub async fn get(&self, id: i32) -> Result<Option<Factory>, DbError> {
        with_conn!(self.pool, conn => {
            factories::table
                .find(id)
                .select(FactoryRecord::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map(|r| r.map(Factory::from))
        })
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Factory>, DbError> {
        with_conn!(self.pool, conn => {
            factories::table
                .filter(factories::name.eq(name))
                .select(FactoryRecord::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map(|r| r.map(Factory::from))
        })
    }

    /// All factories, by name.
    pub async fn list(&self) -> Result<Vec<Factory>, DbError> {
        with_conn!(self.pool, conn => {
            factories::table
                .order(factories::name.asc())
                .select(FactoryRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(Factory::from).collect())
        })
    }

    /// Factories that have polled at least once, most recent first.
    pub async fn list_active(&self) -> Result<Vec<Factory>, DbError> {
        with_conn!(self.pool, conn => {
            factories::table
                .filter(factories::last_poll.is_not_null())
                .order((factories::last_poll.desc(), factories::name.asc()))
                .select(FactoryRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(Factory::from).collect())
        })
    }

    /// Register a screen size. Registering the same size twice is a no-op.
    pub async fn add_screen_size(&self, factory_id: i32, size: ScreenSize) -> Result<(), DbError> {
        let record = NewScreenSizeRecord {
            factory_id,
            width: size.width,
            height: size.height,
        };

        with_conn_split!(self.pool,
            sqlite: conn => {
                diesel::insert_or_ignore_into(factory_screen_sizes::table)
                    .values(&record)
                    .execute(&mut conn)
                    .await?;
                Ok(())
            },
            postgres: conn => {
                diesel::insert_into(factory_screen_sizes::table)
                    .values(&record)
                    .on_conflict_do_nothing()
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        )
    }

    /// Register a color depth. Registering the same depth twice is a no-op.
    pub async fn add_color_depth(&self, factory_id: i32, depth: ColorDepth) -> Result<(), DbError> {
        let record = NewColorDepthRecord {
            factory_id,
            bits_per_pixel: depth.bits_per_pixel,
        };

        with_conn_split!(self.pool,
            sqlite: conn => {
                diesel::insert_or_ignore_into(factory_color_depths::table)
                    .values(&record)
                    .execute(&mut conn)
                    .await?;
                Ok(())
            },
            postgres: conn => {
                diesel::insert_into(factory_color_depths::table)
                    .values(&record)
                    .on_conflict_do_nothing()
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        )
    }

    /// Register an active browser installation.
    pub async fn add_browser(&self, factory_id: i32, browser: &NewBrowser) -> Result<Browser, DbError> {
        let record = NewBrowserRecord {
            factory_id,
            browser_group: &browser.browser_group,
            version: &browser.version,
            major: browser.major,
            minor: browser.minor,
            command: &browser.command,
            javascript: browser.javascript,
            java: browser.java,
            flash: browser.flash,
            active: 1,
        };

        with_conn!(self.pool, conn => {
            diesel::insert_into(factory_browsers::table)
                .values(&record)
                .returning(BrowserRecord::as_returning())
                .get_result(&mut conn)
                .await
                .map(Browser::from)
        })
    }

    /// Enable or disable a browser. Returns false if it does not exist.
    pub async fn set_browser_active(&self, browser_id: i32, active: bool) -> Result<bool, DbError> {
        with_conn!(self.pool, conn => {
            diesel::update(factory_browsers::table.find(browser_id))
                .set(factory_browsers::active.eq(i32::from(active)))
                .execute(&mut conn)
                .await
                .map(|rows| rows > 0)
        })
    }

    /// Load the factory's inventory, each collection in registration order.
    pub async fn get_inventory(&self, factory_id: i32) -> Result<Option<Inventory>, DbError> {
        with_conn!(self.pool, conn => {
            let Some(operating_system) = factories::table
                .find(factory_id)
                .select(factories::operating_system)
                .first::<String>(&mut conn)
                .await
                .optional()?
            else {
                return Ok(None);
            };

            let screen_sizes = factory_screen_sizes::table
                .filter(factory_screen_sizes::factory_id.eq(factory_id))
                .order(factory_screen_sizes::id.asc())
                .select(ScreenSizeRecord::as_select())
                .load(&mut conn)
                .await?;

            let color_depths = factory_color_depths::table
                .filter(factory_color_depths::factory_id.eq(factory_id))
                .order(factory_color_depths::id.asc())
                .select(ColorDepthRecord::as_select())
                .load(&mut conn)
                .await?;

            let browsers = factory_browsers::table
                .filter(factory_browsers::factory_id.eq(factory_id))
                .order(factory_browsers::id.asc())
                .select(BrowserRecord::as_select())
                .load(&mut conn)
                .await?;

            Ok(Some(Inventory {
                factory_id,
                operating_system,
                screen_sizes: screen_sizes.into_iter().map(ScreenSize::from).collect(),
                color_depths: color_depths.into_iter().map(ColorDepth::from).collect(),
                browsers: browsers.into_iter().map(Browser::from).collect(),
            }))
        })
    }

    /// Record a poll: last-poll time and source address.
    pub async fn touch_poll(
        &self,
        factory_id: i32,
        ip: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let at = format_datetime(at);
        with_conn!(self.pool, conn => {
            diesel::update(factories::table.find(factory_id))
                .set((factories::last_poll.eq(&at), factories::ip.eq(ip)))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    /// Record a successful upload.
    pub async fn touch_upload(&self, factory_id: i32, at: DateTime<Utc>) -> Result<(), DbError> {
        let at = format_datetime(at);
        with_conn!(self.pool, conn => {
            diesel::update(factories::table.find(factory_id))
                .set(factories::last_upload.eq(&at))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::version::ENABLED;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    async fn setup() -> (DieselFactoryRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (ctx.factories(), dir)
    }

    fn linux(name: &str) -> NewFactory {
        NewFactory {
            name: name.to_string(),
            operating_system: "linux".to_string(),
            password_hash: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let (repo, _dir) = setup().await;
        let now = Utc::now();

        let created = repo.create(&linux("shot01"), now).await.unwrap();
        assert_eq!(created.name, "shot01");
        assert!(created.last_poll.is_none());

        let by_name = repo.get_by_name("shot01").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert!(repo.get_by_name("missing").await.unwrap().is_none());
        assert!(repo.get(created.id + 100).await.unwrap().is_none());

        assert!(repo.create(&linux("shot01"), now).await.is_err());
    }

    #[tokio::test]
    async fn test_inventory_keeps_registration_order() {
        let (repo, _dir) = setup().await;
        let factory = repo.create(&linux("shot01"), Utc::now()).await.unwrap();

        for size in ["1280x1024", "800x600", "1280x1024"] {
            repo.add_screen_size(factory.id, size.parse().unwrap())
                .await
                .unwrap();
        }
        repo.add_color_depth(factory.id, ColorDepth { bits_per_pixel: 24 })
            .await
            .unwrap();

        let mut firefox = NewBrowser::new("Firefox", "2.0.0.4", 2, 0);
        firefox.javascript = ENABLED;
        let first = repo.add_browser(factory.id, &firefox).await.unwrap();
        repo.add_browser(factory.id, &NewBrowser::new("Opera", "9.5", 9, 5))
            .await
            .unwrap();
        repo.set_browser_active(first.id, false).await.unwrap();

        let inv = repo.get_inventory(factory.id).await.unwrap().unwrap();
        assert_eq!(inv.operating_system, "linux");
        assert_eq!(
            inv.screen_sizes,
            vec![
                ScreenSize { width: 1280, height: 1024 },
                ScreenSize { width: 800, height: 600 },
            ]
        );
        assert_eq!(inv.color_depths.len(), 1);
        assert_eq!(inv.browsers.len(), 2);
        assert_eq!(inv.browsers[0].javascript, ENABLED);
        assert!(!inv.browsers[0].active);
        assert_eq!(inv.active_browsers().count(), 1);

        assert!(repo.get_inventory(factory.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_poll_and_upload() {
        let (repo, _dir) = setup().await;
        let now = Utc::now();
        let a = repo.create(&linux("a"), now).await.unwrap();
        let b = repo.create(&linux("b"), now).await.unwrap();
        repo.create(&linux("idle"), now).await.unwrap();

        repo.touch_poll(a.id, Some("10.0.0.1"), now).await.unwrap();
        repo.touch_poll(b.id, None, now + chrono::Duration::seconds(5))
            .await
            .unwrap();
        repo.touch_upload(a.id, now).await.unwrap();

        let a = repo.get(a.id).await.unwrap().unwrap();
        assert_eq!(a.ip.as_deref(), Some("10.0.0.1"));
        assert!(a.last_upload.is_some());

        let active: Vec<String> = repo
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(active, vec!["b", "a"]);
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }
}
