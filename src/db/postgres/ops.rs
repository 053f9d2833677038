use log::error;

use crate::db::models::{
    DailyTokenPrice, DailyVolume, ListedToken, ListedTokenPrice, Pool, PoolTokenRef, ProtocolStat,
    Token, TokenPrice, TokenPriceLatest,
};
use crate::db::postgres::PostgresClient;
use crate::sync::TrackedPolicy;

/// Hard ceiling on rows returned by time-series range queries.
const MAX_SERIES_LIMIT: usize = 5_000;

/// Sort fields allowed on the latest-pools listing.
///
/// Requested fields outside the allow-list silently coerce to [`Tvl`]
/// rather than erroring, so a malformed query parameter still yields a
/// sensible response.
///
/// [`Tvl`]: PoolSortField::Tvl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolSortField {
    #[default]
    Tvl,
    VolumeUsd,
    FeesUsd,
    Apr,
    UpdatedAt,
}

impl PoolSortField {
    pub fn parse(input: &str) -> Self {
        match input {
            "tvl" | "tvl_usd" => Self::Tvl,
            "volume_usd" => Self::VolumeUsd,
            "fees_usd" => Self::FeesUsd,
            "apr" => Self::Apr,
            "updated_at" => Self::UpdatedAt,
            _ => Self::Tvl,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Tvl => "tvl_usd",
            Self::VolumeUsd => "volume_usd",
            Self::FeesUsd => "fees_usd",
            Self::Apr => "apr",
            Self::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(input: &str) -> Self {
        if input.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl PostgresClient {
    // ==================== TOKENS ====================

    /// Insert or update a single token keyed by its lowercase address.
    pub async fn set_token(&self, token: &Token) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO dagsync.tokens (
                address, symbol, name, decimals, logo_uri, verified, rank, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (address) DO UPDATE SET
                symbol = EXCLUDED.symbol,
                name = EXCLUDED.name,
                decimals = EXCLUDED.decimals,
                logo_uri = EXCLUDED.logo_uri,
                verified = EXCLUDED.verified,
                rank = EXCLUDED.rank,
                updated_at = EXCLUDED.updated_at
        "#;

        client
            .execute(
                query,
                &[
                    &token.address,
                    &token.symbol,
                    &token.name,
                    &token.decimals,
                    &token.logo_uri,
                    &token.verified,
                    &token.rank,
                    &token.updated_at,
                ],
            )
            .await?;

        Ok(())
    }

    /// List tokens ordered by rank (unranked tokens sort last).
    pub async fn get_tokens(&self, limit: usize, offset: usize) -> anyhow::Result<Vec<Token>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT address, symbol, name, decimals, logo_uri, verified, rank, updated_at
            FROM dagsync.tokens
            ORDER BY rank ASC
            LIMIT $1 OFFSET $2
        "#;

        let rows = client
            .query(query, &[&(limit as i64), &(offset as i64)])
            .await?;

        Ok(rows.iter().map(row_to_token).collect())
    }

    /// Addresses of all tokens currently admitted by the tracked policy.
    ///
    /// Computed once at the start of a sync cycle so gating during the cycle
    /// is an O(1) membership check, not a query per record.
    pub async fn get_tracked_addresses(
        &self,
        policy: TrackedPolicy,
    ) -> anyhow::Result<Vec<String>> {
        let client = self.pool.get().await?;
        let query = match policy {
            TrackedPolicy::Verified => "SELECT address FROM dagsync.tokens WHERE verified",
            TrackedPolicy::All => "SELECT address FROM dagsync.tokens",
        };

        let rows = client.query(query, &[]).await?;
        Ok(rows
            .iter()
            .map(|row| {
                let address: String = row.get("address");
                address.to_lowercase()
            })
            .collect())
    }

    // ==================== TOKEN PRICES ====================

    /// Append one price point to the history. Never upserts: every sync
    /// cycle that carries a price produces a new row.
    pub async fn insert_token_price(&self, price: &TokenPrice) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO dagsync.token_prices (
                token_address, symbol, name, logo_uri, price_usd, ts
            ) VALUES ($1, $2, $3, $4, $5, $6)
        "#;

        client
            .execute(
                query,
                &[
                    &price.token_address,
                    &price.symbol,
                    &price.name,
                    &price.logo_uri,
                    &price.price_usd,
                    &price.ts,
                ],
            )
            .await?;

        Ok(())
    }

    /// Replace-or-insert the single current price row for a token.
    pub async fn set_token_price_latest(&self, price: &TokenPriceLatest) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO dagsync.token_prices_latest (
                token_address, symbol, name, logo_uri, price_usd,
                verified, rank, decimals, ts
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (token_address) DO UPDATE SET
                symbol = EXCLUDED.symbol,
                name = EXCLUDED.name,
                logo_uri = EXCLUDED.logo_uri,
                price_usd = EXCLUDED.price_usd,
                verified = EXCLUDED.verified,
                rank = EXCLUDED.rank,
                decimals = EXCLUDED.decimals,
                ts = EXCLUDED.ts
        "#;

        client
            .execute(
                query,
                &[
                    &price.token_address,
                    &price.symbol,
                    &price.name,
                    &price.logo_uri,
                    &price.price_usd,
                    &price.verified,
                    &price.rank,
                    &price.decimals,
                    &price.ts,
                ],
            )
            .await?;

        Ok(())
    }

    /// Price history for one token, oldest first.
    pub async fn get_token_prices(
        &self,
        token_address: &str,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<Vec<TokenPrice>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT token_address, symbol, name, logo_uri, price_usd, ts
            FROM dagsync.token_prices
            WHERE token_address = $1
            ORDER BY ts ASC
            LIMIT $2 OFFSET $3
        "#;

        let rows = client
            .query(
                query,
                &[
                    &token_address.to_lowercase(),
                    &(limit as i64),
                    &(offset as i64),
                ],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| TokenPrice {
                token_address: row.get("token_address"),
                symbol: row.get("symbol"),
                name: row.get("name"),
                logo_uri: row.get("logo_uri"),
                price_usd: row.get("price_usd"),
                ts: row.get("ts"),
            })
            .collect())
    }

    /// Per-day price aggregates for one token, derived from the history.
    pub async fn get_daily_token_prices(
        &self,
        token_address: &str,
    ) -> anyhow::Result<Vec<DailyTokenPrice>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT
                ts::date AS date,
                AVG(price_usd) AS avg_price,
                MIN(price_usd) AS min_price,
                MAX(price_usd) AS max_price,
                (ARRAY_AGG(price_usd ORDER BY ts ASC))[1] AS first_price,
                (ARRAY_AGG(price_usd ORDER BY ts DESC))[1] AS last_price,
                (ARRAY_AGG(symbol ORDER BY ts ASC))[1] AS symbol,
                (ARRAY_AGG(name ORDER BY ts ASC))[1] AS name,
                (ARRAY_AGG(logo_uri ORDER BY ts ASC))[1] AS logo_uri
            FROM dagsync.token_prices
            WHERE token_address = $1
            GROUP BY ts::date
            ORDER BY date ASC
        "#;

        let rows = client
            .query(query, &[&token_address.to_lowercase()])
            .await?;

        Ok(rows
            .iter()
            .map(|row| DailyTokenPrice {
                date: row.get("date"),
                avg_price: row.get("avg_price"),
                min_price: row.get("min_price"),
                max_price: row.get("max_price"),
                first_price: row.get("first_price"),
                last_price: row.get("last_price"),
                symbol: row.get("symbol"),
                name: row.get("name"),
                logo_uri: row.get("logo_uri"),
            })
            .collect())
    }

    /// Current price row for one token, if any.
    pub async fn get_latest_token_price(
        &self,
        token_address: &str,
    ) -> anyhow::Result<Option<TokenPriceLatest>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT token_address, symbol, name, logo_uri, price_usd,
                   verified, rank, decimals, ts
            FROM dagsync.token_prices_latest
            WHERE token_address = $1
        "#;

        let row = client
            .query_opt(query, &[&token_address.to_lowercase()])
            .await?;

        Ok(row.map(|row| TokenPriceLatest {
            token_address: row.get("token_address"),
            symbol: row.get("symbol"),
            name: row.get("name"),
            logo_uri: row.get("logo_uri"),
            price_usd: row.get("price_usd"),
            verified: row.get("verified"),
            rank: row.get("rank"),
            decimals: row.get("decimals"),
            ts: row.get("ts"),
        }))
    }

    // ==================== PROTOCOL STATS ====================

    /// Append one protocol stat observation. Never mutated after insert.
    pub async fn insert_protocol_stat(&self, stat: &ProtocolStat) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO dagsync.protocol_stats (
                dex, total_tvl_usd, total_volume_usd, pool_count, updated_at, inserted_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
        "#;

        client
            .execute(
                query,
                &[
                    &stat.dex,
                    &stat.total_tvl_usd,
                    &stat.total_volume_usd,
                    &stat.pool_count,
                    &stat.updated_at,
                    &stat.inserted_at,
                ],
            )
            .await?;

        Ok(())
    }

    /// Most recent protocol stat observation for a DEX.
    pub async fn get_latest_protocol_stat(
        &self,
        dex: &str,
    ) -> anyhow::Result<Option<ProtocolStat>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT dex, total_tvl_usd, total_volume_usd, pool_count, updated_at, inserted_at
            FROM dagsync.protocol_stats
            WHERE dex = $1
            ORDER BY updated_at DESC
            LIMIT 1
        "#;

        let row = client.query_opt(query, &[&dex]).await?;
        Ok(row.map(|row| row_to_protocol_stat(&row)))
    }

    /// Full protocol stat series for a DEX, oldest first.
    pub async fn get_protocol_stats(&self, dex: &str) -> anyhow::Result<Vec<ProtocolStat>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT dex, total_tvl_usd, total_volume_usd, pool_count, updated_at, inserted_at
            FROM dagsync.protocol_stats
            WHERE dex = $1
            ORDER BY updated_at ASC
        "#;

        let rows = client.query(query, &[&dex]).await?;
        Ok(rows.iter().map(row_to_protocol_stat).collect())
    }

    /// Day-over-day traded volume, derived as max-min of the cumulative
    /// volume observed within each calendar day.
    pub async fn get_daily_volumes(&self, dex: &str) -> anyhow::Result<Vec<DailyVolume>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT
                updated_at::date AS date,
                MAX(total_volume_usd) - MIN(total_volume_usd) AS volume_usd
            FROM dagsync.protocol_stats
            WHERE dex = $1
            GROUP BY updated_at::date
            ORDER BY date ASC
        "#;

        let rows = client.query(query, &[&dex]).await?;
        Ok(rows
            .iter()
            .map(|row| DailyVolume {
                date: row.get("date"),
                volume_usd: row.get("volume_usd"),
            })
            .collect())
    }

    // ==================== POOLS ====================

    /// Append one pool snapshot to the history.
    pub async fn insert_pool_snapshot(&self, pool: &Pool) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        let query = format!(
            "INSERT INTO dagsync.pool_snapshots ({}) VALUES ({})",
            POOL_COLUMNS,
            placeholders(POOL_COLUMN_COUNT)
        );

        client.execute(&query, &pool_params(pool)).await?;

        Ok(())
    }

    /// Replace-or-insert the single live row for a pool.
    ///
    /// The conflict target matches the partial unique index, which skips
    /// legacy rows with an empty address.
    pub async fn set_pool_latest(&self, pool: &Pool) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        let query = format!(
            r#"
            INSERT INTO dagsync.pools_latest ({}) VALUES ({})
            ON CONFLICT (dex, address) WHERE address <> '' DO UPDATE SET
                token0_address = EXCLUDED.token0_address,
                token0_symbol = EXCLUDED.token0_symbol,
                token0_name = EXCLUDED.token0_name,
                token0_decimals = EXCLUDED.token0_decimals,
                token1_address = EXCLUDED.token1_address,
                token1_symbol = EXCLUDED.token1_symbol,
                token1_name = EXCLUDED.token1_name,
                token1_decimals = EXCLUDED.token1_decimals,
                token0_volume = EXCLUDED.token0_volume,
                token1_volume = EXCLUDED.token1_volume,
                token0_fees = EXCLUDED.token0_fees,
                token1_fees = EXCLUDED.token1_fees,
                token0_reserves = EXCLUDED.token0_reserves,
                token1_reserves = EXCLUDED.token1_reserves,
                tvl_usd = EXCLUDED.tvl_usd,
                volume_usd = EXCLUDED.volume_usd,
                fees_usd = EXCLUDED.fees_usd,
                apr = EXCLUDED.apr,
                has_active_farm = EXCLUDED.has_active_farm,
                farm_apr = EXCLUDED.farm_apr,
                has_usd_values = EXCLUDED.has_usd_values,
                regular_fee_rate = EXCLUDED.regular_fee_rate,
                discounted_fee_rate = EXCLUDED.discounted_fee_rate,
                updated_at = EXCLUDED.updated_at,
                synced_at = EXCLUDED.synced_at
            "#,
            POOL_COLUMNS,
            placeholders(POOL_COLUMN_COUNT)
        );

        client.execute(&query, &pool_params(pool)).await?;

        Ok(())
    }

    /// Pool snapshot history, newest first, optionally filtered by address.
    pub async fn get_pool_history(
        &self,
        dex: &str,
        address: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<Vec<Pool>> {
        let client = self.pool.get().await?;

        let rows = match address {
            Some(address) => {
                let query = format!(
                    r#"
                    SELECT {}
                    FROM dagsync.pool_snapshots
                    WHERE dex = $1 AND address = $2
                    ORDER BY updated_at DESC
                    LIMIT $3 OFFSET $4
                    "#,
                    POOL_COLUMNS
                );
                client
                    .query(
                        &query,
                        &[
                            &dex,
                            &address.to_lowercase(),
                            &(limit as i64),
                            &(offset as i64),
                        ],
                    )
                    .await?
            },
            None => {
                let query = format!(
                    r#"
                    SELECT {}
                    FROM dagsync.pool_snapshots
                    WHERE dex = $1
                    ORDER BY updated_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                    POOL_COLUMNS
                );
                client
                    .query(&query, &[&dex, &(limit as i64), &(offset as i64)])
                    .await?
            },
        };

        Ok(rows.iter().map(row_to_pool).collect())
    }

    /// Latest pools sorted by an allow-listed field.
    ///
    /// The sort column is interpolated from [`PoolSortField`], never from
    /// caller input.
    pub async fn get_latest_pools(
        &self,
        dex: &str,
        sort: PoolSortField,
        order: SortOrder,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<Vec<Pool>> {
        let client = self.pool.get().await?;
        let query = format!(
            r#"
            SELECT {}
            FROM dagsync.pools_latest
            WHERE dex = $1
            ORDER BY {} {}
            LIMIT $2 OFFSET $3
            "#,
            POOL_COLUMNS,
            sort.column(),
            order.keyword()
        );

        let rows = client
            .query(&query, &[&dex, &(limit as i64), &(offset as i64)])
            .await?;

        Ok(rows.iter().map(row_to_pool).collect())
    }

    /// Latest state of one pool, if present.
    pub async fn get_latest_pool(&self, dex: &str, address: &str) -> anyhow::Result<Option<Pool>> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM dagsync.pools_latest WHERE dex = $1 AND address = $2",
            POOL_COLUMNS
        );

        let row = client
            .query_opt(&query, &[&dex, &address.to_lowercase()])
            .await?;

        Ok(row.map(|row| row_to_pool(&row)))
    }

    // ==================== LISTED TOKENS ====================

    /// Batch insert/update listed tokens (multi-row VALUES upsert).
    ///
    /// Callers must deduplicate by address first: a multi-row upsert cannot
    /// touch the same key twice in one statement.
    pub async fn set_listed_tokens(&self, tokens: &[ListedToken]) -> anyhow::Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }

        const COLS_PER_ROW: usize = 14;
        const BATCH_SIZE: usize = 300;

        let client = self.pool.get().await?;

        for chunk in tokens.chunks(BATCH_SIZE) {
            let values_clauses: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    let start = i * COLS_PER_ROW + 1;
                    let placeholders: Vec<String> =
                        (start..start + COLS_PER_ROW).map(|n| format!("${}", n)).collect();
                    format!("({})", placeholders.join(", "))
                })
                .collect();

            let query = format!(
                r#"
                INSERT INTO dagsync.listed_tokens (
                    token_address, deployer_address, ticker, name, description,
                    total_supply, image, decimals, state, price, market_cap,
                    extra, updated_at_remote, last_synced_at
                ) VALUES {}
                ON CONFLICT (token_address) WHERE token_address <> '' DO UPDATE SET
                    deployer_address = EXCLUDED.deployer_address,
                    ticker = EXCLUDED.ticker,
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    total_supply = EXCLUDED.total_supply,
                    image = EXCLUDED.image,
                    decimals = EXCLUDED.decimals,
                    state = EXCLUDED.state,
                    price = EXCLUDED.price,
                    market_cap = EXCLUDED.market_cap,
                    extra = EXCLUDED.extra,
                    updated_at_remote = EXCLUDED.updated_at_remote,
                    last_synced_at = EXCLUDED.last_synced_at
                "#,
                values_clauses.join(", ")
            );

            let mut params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
                Vec::with_capacity(chunk.len() * COLS_PER_ROW);

            for token in chunk {
                params.push(&token.token_address);
                params.push(&token.deployer_address);
                params.push(&token.ticker);
                params.push(&token.name);
                params.push(&token.description);
                params.push(&token.total_supply);
                params.push(&token.image);
                params.push(&token.decimals);
                params.push(&token.state);
                params.push(&token.price);
                params.push(&token.market_cap);
                params.push(&token.extra);
                params.push(&token.updated_at_remote);
                params.push(&token.last_synced_at);
            }

            client.execute(&query, &params).await.map_err(|e| {
                error!("Failed to batch upsert {} listed tokens: {:?}", chunk.len(), e);
                e
            })?;
        }

        Ok(())
    }

    /// Batch insert/update bucketed price points keyed by
    /// (token_address, bucket).
    ///
    /// The composite key makes the write idempotent: polls landing in the
    /// same bucket overwrite one row. Callers must deduplicate identities
    /// within the batch first.
    pub async fn set_listed_token_prices(
        &self,
        prices: &[ListedTokenPrice],
    ) -> anyhow::Result<()> {
        if prices.is_empty() {
            return Ok(());
        }

        const COLS_PER_ROW: usize = 16;
        const BATCH_SIZE: usize = 300;

        let client = self.pool.get().await?;

        for chunk in prices.chunks(BATCH_SIZE) {
            let values_clauses: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    let start = i * COLS_PER_ROW + 1;
                    let placeholders: Vec<String> =
                        (start..start + COLS_PER_ROW).map(|n| format!("${}", n)).collect();
                    format!("({})", placeholders.join(", "))
                })
                .collect();

            let query = format!(
                r#"
                INSERT INTO dagsync.listed_token_prices (
                    token_address, bucket, price, market_cap,
                    volume_1h, volume_4h, volume_12h, volume_1d, volume_3d, volume_7d,
                    change_1h, change_4h, change_12h, change_1d, change_3d, change_7d
                ) VALUES {}
                ON CONFLICT (token_address, bucket) DO UPDATE SET
                    price = EXCLUDED.price,
                    market_cap = EXCLUDED.market_cap,
                    volume_1h = EXCLUDED.volume_1h,
                    volume_4h = EXCLUDED.volume_4h,
                    volume_12h = EXCLUDED.volume_12h,
                    volume_1d = EXCLUDED.volume_1d,
                    volume_3d = EXCLUDED.volume_3d,
                    volume_7d = EXCLUDED.volume_7d,
                    change_1h = EXCLUDED.change_1h,
                    change_4h = EXCLUDED.change_4h,
                    change_12h = EXCLUDED.change_12h,
                    change_1d = EXCLUDED.change_1d,
                    change_3d = EXCLUDED.change_3d,
                    change_7d = EXCLUDED.change_7d
                "#,
                values_clauses.join(", ")
            );

            let mut params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
                Vec::with_capacity(chunk.len() * COLS_PER_ROW);

            for price in chunk {
                params.push(&price.token_address);
                params.push(&price.bucket);
                params.push(&price.price);
                params.push(&price.market_cap);
                params.push(&price.volume_1h);
                params.push(&price.volume_4h);
                params.push(&price.volume_12h);
                params.push(&price.volume_1d);
                params.push(&price.volume_3d);
                params.push(&price.volume_7d);
                params.push(&price.change_1h);
                params.push(&price.change_4h);
                params.push(&price.change_12h);
                params.push(&price.change_1d);
                params.push(&price.change_3d);
                params.push(&price.change_7d);
            }

            client.execute(&query, &params).await.map_err(|e| {
                error!(
                    "Failed to batch upsert {} listed token prices: {:?}",
                    chunk.len(),
                    e
                );
                e
            })?;
        }

        Ok(())
    }

    /// Bucketed price series for one listed token, optionally bounded.
    pub async fn get_listed_token_prices(
        &self,
        token_address: &str,
        from: Option<chrono::DateTime<chrono::Utc>>,
        to: Option<chrono::DateTime<chrono::Utc>>,
        order: SortOrder,
        limit: usize,
    ) -> anyhow::Result<Vec<ListedTokenPrice>> {
        let client = self.pool.get().await?;
        let query = format!(
            r#"
            SELECT token_address, bucket, price, market_cap,
                   volume_1h, volume_4h, volume_12h, volume_1d, volume_3d, volume_7d,
                   change_1h, change_4h, change_12h, change_1d, change_3d, change_7d
            FROM dagsync.listed_token_prices
            WHERE token_address = $1
              AND ($2::timestamptz IS NULL OR bucket >= $2)
              AND ($3::timestamptz IS NULL OR bucket <= $3)
            ORDER BY bucket {}
            LIMIT $4
            "#,
            order.keyword()
        );

        let rows = client
            .query(
                &query,
                &[
                    &token_address.to_lowercase(),
                    &from,
                    &to,
                    &(limit.min(MAX_SERIES_LIMIT) as i64),
                ],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| ListedTokenPrice {
                token_address: row.get("token_address"),
                bucket: row.get("bucket"),
                price: row.get("price"),
                market_cap: row.get("market_cap"),
                volume_1h: row.get("volume_1h"),
                volume_4h: row.get("volume_4h"),
                volume_12h: row.get("volume_12h"),
                volume_1d: row.get("volume_1d"),
                volume_3d: row.get("volume_3d"),
                volume_7d: row.get("volume_7d"),
                change_1h: row.get("change_1h"),
                change_4h: row.get("change_4h"),
                change_12h: row.get("change_12h"),
                change_1d: row.get("change_1d"),
                change_3d: row.get("change_3d"),
                change_7d: row.get("change_7d"),
            })
            .collect())
    }
}

// ==================== HELPER FUNCTIONS ====================

/// Shared column list for the two pool collections (identical shapes).
const POOL_COLUMNS: &str = "dex, address, \
    token0_address, token0_symbol, token0_name, token0_decimals, \
    token1_address, token1_symbol, token1_name, token1_decimals, \
    token0_volume, token1_volume, token0_fees, token1_fees, \
    token0_reserves, token1_reserves, tvl_usd, volume_usd, fees_usd, \
    apr, has_active_farm, farm_apr, has_usd_values, \
    regular_fee_rate, discounted_fee_rate, updated_at, synced_at";

const POOL_COLUMN_COUNT: usize = 27;

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|n| format!("${}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn pool_params(pool: &Pool) -> [&(dyn tokio_postgres::types::ToSql + Sync); POOL_COLUMN_COUNT] {
    [
        &pool.dex,
        &pool.address,
        &pool.token0.address,
        &pool.token0.symbol,
        &pool.token0.name,
        &pool.token0.decimals,
        &pool.token1.address,
        &pool.token1.symbol,
        &pool.token1.name,
        &pool.token1.decimals,
        &pool.token0_volume,
        &pool.token1_volume,
        &pool.token0_fees,
        &pool.token1_fees,
        &pool.token0_reserves,
        &pool.token1_reserves,
        &pool.tvl_usd,
        &pool.volume_usd,
        &pool.fees_usd,
        &pool.apr,
        &pool.has_active_farm,
        &pool.farm_apr,
        &pool.has_usd_values,
        &pool.regular_fee_rate,
        &pool.discounted_fee_rate,
        &pool.updated_at,
        &pool.synced_at,
    ]
}

fn row_to_token(row: &tokio_postgres::Row) -> Token {
    // Lowercase addresses for consistent comparisons
    let address: String = row.get("address");
    Token {
        address: address.to_lowercase(),
        symbol: row.get("symbol"),
        name: row.get("name"),
        decimals: row.get("decimals"),
        logo_uri: row.get("logo_uri"),
        verified: row.get("verified"),
        rank: row.get("rank"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_protocol_stat(row: &tokio_postgres::Row) -> ProtocolStat {
    ProtocolStat {
        dex: row.get("dex"),
        total_tvl_usd: row.get("total_tvl_usd"),
        total_volume_usd: row.get("total_volume_usd"),
        pool_count: row.get("pool_count"),
        updated_at: row.get("updated_at"),
        inserted_at: row.get("inserted_at"),
    }
}

fn row_to_pool(row: &tokio_postgres::Row) -> Pool {
    // Helper to get a string column lowercased for address normalization
    fn get_lowercased(row: &tokio_postgres::Row, col: &str) -> String {
        let val: String = row.get(col);
        val.to_lowercase()
    }

    Pool {
        dex: row.get("dex"),
        address: get_lowercased(row, "address"),
        token0: PoolTokenRef {
            address: get_lowercased(row, "token0_address"),
            symbol: row.get("token0_symbol"),
            name: row.get("token0_name"),
            decimals: row.get("token0_decimals"),
        },
        token1: PoolTokenRef {
            address: get_lowercased(row, "token1_address"),
            symbol: row.get("token1_symbol"),
            name: row.get("token1_name"),
            decimals: row.get("token1_decimals"),
        },
        token0_volume: row.get("token0_volume"),
        token1_volume: row.get("token1_volume"),
        token0_fees: row.get("token0_fees"),
        token1_fees: row.get("token1_fees"),
        token0_reserves: row.get("token0_reserves"),
        token1_reserves: row.get("token1_reserves"),
        tvl_usd: row.get("tvl_usd"),
        volume_usd: row.get("volume_usd"),
        fees_usd: row.get("fees_usd"),
        apr: row.get("apr"),
        has_active_farm: row.get("has_active_farm"),
        farm_apr: row.get("farm_apr"),
        has_usd_values: row.get("has_usd_values"),
        regular_fee_rate: row.get("regular_fee_rate"),
        discounted_fee_rate: row.get("discounted_fee_rate"),
        updated_at: row.get("updated_at"),
        synced_at: row.get("synced_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sort_field_coerces_to_tvl() {
        assert_eq!(PoolSortField::parse("tvl"), PoolSortField::Tvl);
        assert_eq!(PoolSortField::parse("apr"), PoolSortField::Apr);
        assert_eq!(PoolSortField::parse("updated_at"), PoolSortField::UpdatedAt);
        // Not in the allow-list: must fall back, not error
        assert_eq!(PoolSortField::parse("address"), PoolSortField::Tvl);
        assert_eq!(
            PoolSortField::parse("tvl; DROP TABLE dagsync.pools_latest"),
            PoolSortField::Tvl
        );
    }

    #[test]
    fn test_sort_order_defaults_to_desc() {
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("ASC"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Desc);
    }

    #[test]
    fn test_pool_placeholder_count_matches_columns() {
        let cols = POOL_COLUMNS.split(',').count();
        assert_eq!(cols, POOL_COLUMN_COUNT);
        assert!(placeholders(POOL_COLUMN_COUNT).ends_with("$27"));
    }
}
