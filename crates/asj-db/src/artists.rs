//! People, artists, spaces and allocations.

use anyhow::{anyhow, Context, Result};
use asj_allocation::{Allocator, SpaceAmount, SpaceDefinition, SpaceRequest};
use asj_ledger::PricedAllocation;
use asj_money::Cents;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct NewPerson {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub telegram_chat_id: Option<i64>,
}

pub async fn insert_person(pool: &PgPool, person: &NewPerson) -> Result<i32> {
    let row = sqlx::query(
        r#"
        insert into people (name, email, phone, address, telegram_chat_id)
        values ($1, $2, $3, $4, $5)
        returning person_id
        "#,
    )
    .bind(&person.name)
    .bind(&person.email)
    .bind(&person.phone)
    .bind(&person.address)
    .bind(person.telegram_chat_id)
    .fetch_one(pool)
    .await
    .context("insert_person failed")?;
    Ok(row.try_get("person_id")?)
}

#[derive(Debug, Clone)]
pub struct NewArtist {
    /// Explicit artist ID, or `None` to take the next free one.
    pub artist_id: Option<i32>,
    pub person_id: i32,
    pub artist_name: String,
    pub payment_to: String,
    pub reservation_date: DateTime<Utc>,
}

/// Insert an artist, assigning the next artist ID when none is given.
pub async fn insert_artist(pool: &PgPool, artist: &NewArtist) -> Result<i32> {
    let mut tx = pool.begin().await.context("insert_artist begin failed")?;

    let artist_id = match artist.artist_id {
        Some(id) => id,
        None => {
            let row = sqlx::query(
                "select coalesce(max(artist_id), 0) + 1 as next_id from artists",
            )
            .fetch_one(&mut *tx)
            .await
            .context("insert_artist next-id query failed")?;
            row.try_get::<i32, _>("next_id")?
        }
    };

    sqlx::query(
        r#"
        insert into artists (artist_id, person_id, artist_name, payment_to, reservation_date)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(artist_id)
    .bind(artist.person_id)
    .bind(&artist.artist_name)
    .bind(&artist.payment_to)
    .bind(artist.reservation_date)
    .execute(&mut *tx)
    .await
    .context("insert_artist failed")?;

    tx.commit().await.context("insert_artist commit failed")?;
    Ok(artist_id)
}

#[derive(Debug, Clone)]
pub struct ArtistRow {
    pub artist_id: i32,
    pub person_id: i32,
    pub person_name: String,
    pub email: String,
    pub telegram_chat_id: Option<i64>,
    pub artist_name: String,
    pub payment_to: String,
    pub reservation_date: DateTime<Utc>,
}

impl ArtistRow {
    /// Name shown in the show's catalogue.
    pub fn display_name(&self) -> &str {
        if self.artist_name.is_empty() {
            &self.person_name
        } else {
            &self.artist_name
        }
    }

    /// Name cheques are written to.
    pub fn cheque_name(&self) -> &str {
        if self.payment_to.is_empty() {
            &self.person_name
        } else {
            &self.payment_to
        }
    }
}

fn artist_from_row(row: &sqlx::postgres::PgRow) -> Result<ArtistRow> {
    Ok(ArtistRow {
        artist_id: row.try_get("artist_id")?,
        person_id: row.try_get("person_id")?,
        person_name: row.try_get("person_name")?,
        email: row.try_get("email")?,
        telegram_chat_id: row.try_get("telegram_chat_id")?,
        artist_name: row.try_get("artist_name")?,
        payment_to: row.try_get("payment_to")?,
        reservation_date: row.try_get("reservation_date")?,
    })
}

const ARTIST_SELECT: &str = r#"
    select
      a.artist_id,
      a.person_id,
      p.name as person_name,
      p.email,
      p.telegram_chat_id,
      a.artist_name,
      a.payment_to,
      a.reservation_date
    from artists a
    join people p on p.person_id = a.person_id
"#;

pub async fn fetch_artist(pool: &PgPool, artist_id: i32) -> Result<ArtistRow> {
    let row = sqlx::query(&format!("{ARTIST_SELECT} where a.artist_id = $1"))
        .bind(artist_id)
        .fetch_one(pool)
        .await
        .context("fetch_artist failed")?;
    artist_from_row(&row)
}

pub async fn list_artists(pool: &PgPool) -> Result<Vec<ArtistRow>> {
    let rows = sqlx::query(&format!("{ARTIST_SELECT} order by a.artist_id"))
        .fetch_all(pool)
        .await
        .context("list_artists failed")?;
    rows.iter().map(artist_from_row).collect()
}

// ---------------------------------------------------------------------------
// Spaces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewSpace {
    pub shortname: String,
    pub name: String,
    pub price: Cents,
    pub capacity: SpaceAmount,
    pub allow_half: bool,
}

pub async fn insert_space(pool: &PgPool, space: &NewSpace) -> Result<i32> {
    let row = sqlx::query(
        r#"
        insert into spaces (shortname, name, price_cents, capacity_halves, allow_half)
        values ($1, $2, $3, $4, $5)
        returning space_id
        "#,
    )
    .bind(&space.shortname)
    .bind(&space.name)
    .bind(space.price.raw())
    .bind(space.capacity.halves())
    .bind(space.allow_half)
    .fetch_one(pool)
    .await
    .context("insert_space failed")?;
    Ok(row.try_get("space_id")?)
}

#[derive(Debug, Clone)]
pub struct SpaceRow {
    pub space_id: i32,
    pub shortname: String,
    pub name: String,
    pub price: Cents,
    pub capacity: SpaceAmount,
    pub allow_half: bool,
    /// Σ allocated over all artists.
    pub allocated: SpaceAmount,
}

impl SpaceRow {
    pub fn remaining(&self) -> SpaceAmount {
        self.capacity.saturating_sub(self.allocated)
    }
}

pub async fn list_spaces(pool: &PgPool) -> Result<Vec<SpaceRow>> {
    let rows = sqlx::query(
        r#"
        select
          s.space_id,
          s.shortname,
          s.name,
          s.price_cents,
          s.capacity_halves,
          s.allow_half,
          coalesce(sum(al.allocated_halves), 0)::int as allocated_halves
        from spaces s
        left join allocations al on al.space_id = s.space_id
        group by s.space_id
        order by s.space_id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("list_spaces failed")?;

    rows.iter()
        .map(|row| {
            Ok(SpaceRow {
                space_id: row.try_get("space_id")?,
                shortname: row.try_get("shortname")?,
                name: row.try_get("name")?,
                price: Cents::new(row.try_get("price_cents")?),
                capacity: space_amount(row.try_get("capacity_halves")?)?,
                allow_half: row.try_get("allow_half")?,
                allocated: space_amount(row.try_get("allocated_halves")?)?,
            })
        })
        .collect()
}

fn space_amount(halves: i32) -> Result<SpaceAmount> {
    SpaceAmount::from_halves(halves).map_err(|e| anyhow!("bad space amount in db: {e}"))
}

// ---------------------------------------------------------------------------
// Allocations
// ---------------------------------------------------------------------------

/// Record (or replace) what an artist asked for on one space type.
pub async fn set_requested_allocation(
    pool: &PgPool,
    artist_id: i32,
    space_id: i32,
    requested: SpaceAmount,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into allocations (artist_id, space_id, requested_halves)
        values ($1, $2, $3)
        on conflict (artist_id, space_id)
        do update set requested_halves = excluded.requested_halves
        "#,
    )
    .bind(artist_id)
    .bind(space_id)
    .bind(requested.halves())
    .execute(pool)
    .await
    .context("set_requested_allocation failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AllocationRow {
    pub allocation_id: i32,
    pub artist_id: i32,
    pub space_id: i32,
    pub space_shortname: String,
    pub unit_price: Cents,
    pub requested: SpaceAmount,
    pub allocated: SpaceAmount,
}

impl AllocationRow {
    pub fn priced(&self) -> PricedAllocation {
        PricedAllocation {
            space_shortname: self.space_shortname.clone(),
            unit_price: self.unit_price,
            requested: self.requested,
            allocated: self.allocated,
        }
    }
}

pub async fn list_allocations_for_artist(
    pool: &PgPool,
    artist_id: i32,
) -> Result<Vec<AllocationRow>> {
    let rows = sqlx::query(
        r#"
        select
          al.allocation_id,
          al.artist_id,
          al.space_id,
          s.shortname,
          s.price_cents,
          al.requested_halves,
          al.allocated_halves
        from allocations al
        join spaces s on s.space_id = al.space_id
        where al.artist_id = $1
        order by al.space_id
        "#,
    )
    .bind(artist_id)
    .fetch_all(pool)
    .await
    .context("list_allocations_for_artist failed")?;

    rows.iter()
        .map(|row| {
            Ok(AllocationRow {
                allocation_id: row.try_get("allocation_id")?,
                artist_id: row.try_get("artist_id")?,
                space_id: row.try_get("space_id")?,
                space_shortname: row.try_get("shortname")?,
                unit_price: Cents::new(row.try_get("price_cents")?),
                requested: space_amount(row.try_get("requested_halves")?)?,
                allocated: space_amount(row.try_get("allocated_halves")?)?,
            })
        })
        .collect()
}

/// Every allocation across all artists, for reporting.
pub async fn list_all_allocations(pool: &PgPool) -> Result<Vec<AllocationRow>> {
    let rows = sqlx::query(
        r#"
        select
          al.allocation_id,
          al.artist_id,
          al.space_id,
          s.shortname,
          s.price_cents,
          al.requested_halves,
          al.allocated_halves
        from allocations al
        join spaces s on s.space_id = al.space_id
        order by al.artist_id, al.space_id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("list_all_allocations failed")?;

    rows.iter()
        .map(|row| {
            Ok(AllocationRow {
                allocation_id: row.try_get("allocation_id")?,
                artist_id: row.try_get("artist_id")?,
                space_id: row.try_get("space_id")?,
                space_shortname: row.try_get("shortname")?,
                unit_price: Cents::new(row.try_get("price_cents")?),
                requested: space_amount(row.try_get("requested_halves")?)?,
                allocated: space_amount(row.try_get("allocated_halves")?)?,
            })
        })
        .collect()
}

/// Outcome of one allocation run, for operator display.
#[derive(Debug, Clone)]
pub struct AllocationRunSummary {
    pub granted: usize,
    pub rejected: usize,
}

/// Allocate outstanding space requests first-come-first-served.
///
/// Loads remaining capacity per space and every request still short of its
/// ask, runs the pure allocator ordered by reservation date, and adds the
/// grants onto `allocated_halves` in one transaction. Re-running is safe:
/// satisfied requests ask for nothing.
pub async fn run_space_allocation(pool: &PgPool) -> Result<AllocationRunSummary> {
    let spaces = list_spaces(pool).await?;
    let definitions: Vec<SpaceDefinition> = spaces
        .iter()
        .map(|s| SpaceDefinition {
            space_id: s.space_id,
            capacity: s.remaining(),
            allow_half: s.allow_half,
        })
        .collect();

    let rows = sqlx::query(
        r#"
        select
          al.artist_id,
          al.space_id,
          al.requested_halves - al.allocated_halves as needed_halves,
          a.reservation_date
        from allocations al
        join artists a on a.artist_id = al.artist_id
        where al.requested_halves > al.allocated_halves
        "#,
    )
    .fetch_all(pool)
    .await
    .context("run_space_allocation load failed")?;

    let mut requests = Vec::with_capacity(rows.len());
    for row in &rows {
        requests.push(SpaceRequest {
            artist_id: row.try_get("artist_id")?,
            space_id: row.try_get("space_id")?,
            requested: space_amount(row.try_get("needed_halves")?)?,
            reserved_at: row.try_get("reservation_date")?,
        });
    }

    let allocator = Allocator::new(definitions).map_err(|e| anyhow!("{e}"))?;
    let decision = allocator.allocate(&requests).map_err(|e| anyhow!("{e}"))?;

    let mut tx = pool.begin().await.context("run_space_allocation begin failed")?;
    for grant in &decision.grants {
        sqlx::query(
            r#"
            update allocations
            set allocated_halves = allocated_halves + $3
            where artist_id = $1 and space_id = $2
            "#,
        )
        .bind(grant.artist_id)
        .bind(grant.space_id)
        .bind(grant.allocated.halves())
        .execute(&mut *tx)
        .await
        .context("run_space_allocation update failed")?;
    }
    tx.commit()
        .await
        .context("run_space_allocation commit failed")?;

    Ok(AllocationRunSummary {
        granted: decision.grants.len(),
        rejected: decision.rejected.len(),
    })
}
