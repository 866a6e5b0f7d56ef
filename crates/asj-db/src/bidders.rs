//! Bidders and their check-digit codes.

use anyhow::{anyhow, Context, Result};
use asj_catalog::codes::{check_code, make_check_digit};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct NewBidder {
    pub person_id: i32,
    pub at_con_contact: String,
}

pub async fn insert_bidder(pool: &PgPool, bidder: &NewBidder) -> Result<i32> {
    let row = sqlx::query(
        r#"
        insert into bidders (person_id, at_con_contact)
        values ($1, $2)
        returning bidder_id
        "#,
    )
    .bind(bidder.person_id)
    .bind(&bidder.at_con_contact)
    .fetch_one(pool)
    .await
    .context("insert_bidder failed")?;
    Ok(row.try_get("bidder_id")?)
}

/// Attach a pre-printed code to a bidder. The code's checksum is verified
/// against the show's offset before it is accepted.
pub async fn assign_bidder_code(
    pool: &PgPool,
    bidder_id: i32,
    code: &str,
    offset: u32,
    check10: char,
) -> Result<()> {
    match check_code(code, offset, check10) {
        Ok(true) => {}
        Ok(false) => return Err(anyhow!("bidder code {code} fails its checksum")),
        Err(e) => return Err(anyhow!("bidder code {code} malformed: {e}")),
    }

    sqlx::query("insert into bidder_codes (code, bidder_id) values ($1, $2)")
        .bind(code)
        .bind(bidder_id)
        .execute(pool)
        .await
        .context("assign_bidder_code failed")?;
    Ok(())
}

/// Mint the next batch of bidder codes without attaching them to anyone.
///
/// Codes are generated sequentially from `start`; registration staff hand
/// them out and attach them with [`assign_bidder_code`].
pub fn generate_codes(start: u32, count: u32, offset: u32, check10: char) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(count as usize);
    for n in start..start + count {
        let body = n.to_string();
        let check = make_check_digit(&body, offset, check10).map_err(|e| anyhow!("{e}"))?;
        out.push(format!("{body}{check}"));
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct BidderRow {
    pub bidder_id: i32,
    pub person_id: i32,
    pub person_name: String,
    pub email: String,
    pub telegram_chat_id: Option<i64>,
    pub codes: Vec<String>,
}

pub async fn fetch_bidder(pool: &PgPool, bidder_id: i32) -> Result<BidderRow> {
    let row = sqlx::query(
        r#"
        select b.bidder_id, b.person_id, p.name as person_name, p.email, p.telegram_chat_id
        from bidders b
        join people p on p.person_id = b.person_id
        where b.bidder_id = $1
        "#,
    )
    .bind(bidder_id)
    .fetch_one(pool)
    .await
    .context("fetch_bidder failed")?;

    let codes: Vec<String> = sqlx::query(
        "select code from bidder_codes where bidder_id = $1 order by code",
    )
    .bind(bidder_id)
    .fetch_all(pool)
    .await
    .context("fetch_bidder codes failed")?
    .iter()
    .map(|r| r.try_get("code").map_err(anyhow::Error::from))
    .collect::<Result<_>>()?;

    Ok(BidderRow {
        bidder_id: row.try_get("bidder_id")?,
        person_id: row.try_get("person_id")?,
        person_name: row.try_get("person_name")?,
        email: row.try_get("email")?,
        telegram_chat_id: row.try_get("telegram_chat_id")?,
        codes,
    })
}

/// Bind a verified Telegram account to the bidder's person record so
/// results can be delivered there.
pub async fn link_bidder_telegram(
    pool: &PgPool,
    bidder_id: i32,
    telegram_chat_id: i64,
) -> Result<()> {
    let res = sqlx::query(
        r#"
        update people
        set telegram_chat_id = $2
        where person_id = (select person_id from bidders where bidder_id = $1)
        "#,
    )
    .bind(bidder_id)
    .bind(telegram_chat_id)
    .execute(pool)
    .await
    .context("link_bidder_telegram failed")?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("no such bidder {bidder_id}"));
    }
    Ok(())
}

/// Resolve a bid-sheet code to its bidder, or `None` if unassigned.
pub async fn find_bidder_by_code(pool: &PgPool, code: &str) -> Result<Option<i32>> {
    let row = sqlx::query("select bidder_id from bidder_codes where code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
        .context("find_bidder_by_code failed")?;
    match row {
        Some(r) => Ok(Some(r.try_get("bidder_id")?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_sequential_and_valid() {
        let codes = generate_codes(195, 3, 0, 'X').unwrap();
        assert_eq!(codes.len(), 3);
        assert_eq!(codes[1], "1961");
        assert_eq!(codes[2], "197X");
        for code in &codes {
            assert_eq!(check_code(code, 0, 'X'), Ok(true));
        }
    }
}
