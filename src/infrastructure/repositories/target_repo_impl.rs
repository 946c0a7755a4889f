// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::target::{Target, TargetStatus};
use crate::domain::repositories::target_repository::{
    RepositoryError, SortField, SortOrder, TargetQuery, TargetRepository,
};
use crate::infrastructure::database::entities::target as target_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{sea_query::Expr, *};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// 目标仓库实现
pub struct TargetRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TargetRepositoryImpl {
    /// 创建新的目标仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

/// 唯一约束冲突映射为 `AlreadyExists`，其余保持为数据库错误
fn map_db_err(e: DbErr) -> RepositoryError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => RepositoryError::AlreadyExists,
        _ => RepositoryError::Database(e),
    }
}

fn to_domain(m: target_entity::Model) -> Result<Target, RepositoryError> {
    let status = m.status.parse::<TargetStatus>().map_err(|_| {
        RepositoryError::Database(DbErr::Custom(format!(
            "Invalid target status: {}",
            m.status
        )))
    })?;
    let headings_count: BTreeMap<String, i32> = serde_json::from_value(m.headings_count)
        .map_err(|e| RepositoryError::Database(DbErr::Custom(e.to_string())))?;

    Ok(Target {
        id: m.id,
        url: m.url,
        status,
        title: m.title,
        html_version: m.html_version,
        headings_count,
        internal_links: m.internal_links,
        external_links: m.external_links,
        broken_links: m.broken_links,
        has_login_form: m.has_login_form,
        created_at: m.created_at.into(),
        updated_at: m.updated_at.into(),
        crawl_started_at: m.crawl_started_at.map(Into::into),
        crawl_finished_at: m.crawl_finished_at.map(Into::into),
    })
}

fn headings_json(target: &Target) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(&target.headings_count)
        .map_err(|e| RepositoryError::Database(DbErr::Custom(e.to_string())))
}

fn sort_column(field: SortField) -> target_entity::Column {
    match field {
        SortField::Status => target_entity::Column::Status,
        SortField::Title => target_entity::Column::Title,
        SortField::Url => target_entity::Column::Url,
        SortField::HtmlVersion => target_entity::Column::HtmlVersion,
        SortField::InternalLinks => target_entity::Column::InternalLinks,
        SortField::ExternalLinks => target_entity::Column::ExternalLinks,
        SortField::BrokenLinks => target_entity::Column::BrokenLinks,
        SortField::CreatedAt => target_entity::Column::CreatedAt,
    }
}

#[async_trait]
impl TargetRepository for TargetRepositoryImpl {
    async fn create(&self, target: &Target) -> Result<Target, RepositoryError> {
        let model = target_entity::ActiveModel {
            id: Set(target.id),
            url: Set(target.url.clone()),
            status: Set(target.status.to_string()),
            title: Set(target.title.clone()),
            html_version: Set(target.html_version.clone()),
            headings_count: Set(headings_json(target)?),
            internal_links: Set(target.internal_links),
            external_links: Set(target.external_links),
            broken_links: Set(target.broken_links),
            has_login_form: Set(target.has_login_form),
            created_at: Set(target.created_at.into()),
            updated_at: Set(target.updated_at.into()),
            crawl_started_at: Set(target.crawl_started_at.map(Into::into)),
            crawl_finished_at: Set(target.crawl_finished_at.map(Into::into)),
        };

        model.insert(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(target.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Target>, RepositoryError> {
        target_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(to_domain)
            .transpose()
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Target>, RepositoryError> {
        target_entity::Entity::find()
            .filter(target_entity::Column::Url.eq(url))
            .one(self.db.as_ref())
            .await?
            .map(to_domain)
            .transpose()
    }

    async fn save(&self, target: &Target) -> Result<Target, RepositoryError> {
        let mut model: target_entity::ActiveModel = target_entity::Entity::find_by_id(target.id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?
            .into();

        model.status = Set(target.status.to_string());
        model.title = Set(target.title.clone());
        model.html_version = Set(target.html_version.clone());
        model.headings_count = Set(headings_json(target)?);
        model.internal_links = Set(target.internal_links);
        model.external_links = Set(target.external_links);
        model.broken_links = Set(target.broken_links);
        model.has_login_form = Set(target.has_login_form);
        model.updated_at = Set(target.updated_at.into());
        model.crawl_started_at = Set(target.crawl_started_at.map(Into::into));
        model.crawl_finished_at = Set(target.crawl_finished_at.map(Into::into));

        model.update(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(target.clone())
    }

    async fn mark_crawl_started(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let started_at: DateTime<FixedOffset> = started_at.into();
        let result = target_entity::Entity::update_many()
            .col_expr(
                target_entity::Column::CrawlStartedAt,
                Expr::value(Some(started_at)),
            )
            .filter(target_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: TargetStatus) -> Result<(), RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = target_entity::Entity::update_many()
            .col_expr(target_entity::Column::Status, Expr::value(status.as_str()))
            .col_expr(target_entity::Column::UpdatedAt, Expr::value(now))
            .filter(target_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, query: &TargetQuery) -> Result<(Vec<Target>, u64), RepositoryError> {
        let mut select = target_entity::Entity::find();

        if let Some(search) = &query.search {
            let pattern = format!("%{}%", search);
            select = select.filter(
                Condition::any()
                    .add(target_entity::Column::Url.like(pattern.clone()))
                    .add(target_entity::Column::Title.like(pattern)),
            );
        }
        if let Some(status) = query.status {
            select = select.filter(target_entity::Column::Status.eq(status.as_str()));
        }
        if let Some(version) = &query.html_version {
            select = select.filter(target_entity::Column::HtmlVersion.eq(version.as_str()));
        }
        if let Some(has_login_form) = query.has_login_form {
            select = select.filter(target_entity::Column::HasLoginForm.eq(has_login_form));
        }
        let ranges = [
            (
                target_entity::Column::InternalLinks,
                query.internal_links_min,
                query.internal_links_max,
            ),
            (
                target_entity::Column::ExternalLinks,
                query.external_links_min,
                query.external_links_max,
            ),
            (
                target_entity::Column::BrokenLinks,
                query.broken_links_min,
                query.broken_links_max,
            ),
        ];
        for (column, min, max) in ranges {
            if let Some(min) = min {
                select = select.filter(column.gte(min));
            }
            if let Some(max) = max {
                select = select.filter(column.lte(max));
            }
        }

        let periods = [
            (
                target_entity::Column::CreatedAt,
                query.created_from,
                query.created_to,
            ),
            (
                target_entity::Column::CrawlFinishedAt,
                query.crawled_from,
                query.crawled_to,
            ),
        ];
        for (column, from, to) in periods {
            if let Some(from) = from {
                let from: DateTime<FixedOffset> = from.into();
                select = select.filter(column.gte(from));
            }
            if let Some(to) = to {
                let to: DateTime<FixedOffset> = to.into();
                select = select.filter(column.lte(to));
            }
        }

        let total = select.clone().count(self.db.as_ref()).await?;

        let order = match query.sort_order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        let page = query.page.max(1);
        let limit = query.limit.max(1);

        let models = select
            .order_by(sort_column(query.sort_by), order.clone())
            .order_by(target_entity::Column::Id, order)
            .offset((page - 1) * limit)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        let targets = models
            .into_iter()
            .map(to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((targets, total))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = target_entity::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, RepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = target_entity::Entity::delete_many()
            .filter(target_entity::Column::Id.is_in(ids.iter().copied()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn reset_interrupted(&self) -> Result<u64, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = target_entity::Entity::update_many()
            .col_expr(
                target_entity::Column::Status,
                Expr::value(TargetStatus::Failed.as_str()),
            )
            .col_expr(target_entity::Column::UpdatedAt, Expr::value(now))
            .filter(target_entity::Column::Status.eq(TargetStatus::Crawling.as_str()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
