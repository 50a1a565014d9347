//! Read-only queries against the ASITRON ERP database
//!
//! Table and column names are the ERP's own. Search text is always bound,
//! never interpolated.

use asigest_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// Default row cap for ERP lists
pub const DEFAULT_LIMIT: i64 = 100;

/// Largest row cap a client may request
pub const MAX_LIMIT: i64 = 500;

/// Work order (AnagraficaCommesse) with its customer name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ErpOrder {
    #[sqlx(rename = "Progressivo")]
    pub order_id: i64,
    #[sqlx(rename = "AnnoCom")]
    pub year: i64,
    #[sqlx(rename = "NumCom")]
    pub number: i64,
    #[sqlx(rename = "Riferimento")]
    pub customer_reference: Option<String>,
    #[sqlx(rename = "CliCommitt")]
    pub customer_code: Option<String>,
    pub customer_name: String,
    #[sqlx(rename = "Oggetto")]
    pub subject: Option<String>,
    /// ERP date text, passed through as stored
    #[sqlx(rename = "DataEmissione")]
    pub issued_on: Option<String>,
    #[sqlx(rename = "DataConsegnaContr")]
    pub delivery_due: Option<String>,
    /// 0 = open
    #[sqlx(rename = "StatoCommessa")]
    pub status: i64,
}

/// Article (ANAGRAFICAARTICOLI)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ErpArticle {
    #[sqlx(rename = "CODICE")]
    pub code: String,
    #[sqlx(rename = "DESCRIZIONE")]
    pub description: Option<String>,
    #[sqlx(rename = "ARTTIPOLOGIA")]
    pub kind: Option<String>,
}

/// Customer or supplier (ANAGRAFICACF)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ErpCustomer {
    #[sqlx(rename = "CODCONTO")]
    pub code: String,
    #[sqlx(rename = "DSCCONTO1")]
    pub name: String,
    #[sqlx(rename = "DSCCONTO2")]
    pub name_extra: Option<String>,
    #[sqlx(rename = "PARTITAIVA")]
    pub vat_number: Option<String>,
    #[sqlx(rename = "CODFISCALE")]
    pub tax_code: Option<String>,
    #[sqlx(rename = "INDIRIZZO")]
    pub address: Option<String>,
    #[sqlx(rename = "LOCALITA")]
    pub city: Option<String>,
    #[sqlx(rename = "PROVINCIA")]
    pub province: Option<String>,
    #[sqlx(rename = "CAP")]
    pub postal_code: Option<String>,
}

const ORDER_SELECT: &str = r#"
    SELECT a.Progressivo, a.AnnoCom, a.NumCom, a.Riferimento, a.CliCommitt,
           COALESCE(c.DSCCONTO1, '') AS customer_name,
           a.Oggetto, a.DataEmissione, a.DataConsegnaContr, a.StatoCommessa
    FROM AnagraficaCommesse a
    LEFT JOIN ANAGRAFICACF c ON a.CliCommitt = c.CODCONTO
"#;

/// Orders, newest first; `open` selects StatoCommessa = 0 or <> 0
pub async fn list_orders(erp: &SqlitePool, open: bool, limit: i64) -> Result<Vec<ErpOrder>> {
    let condition = if open {
        "WHERE a.StatoCommessa = 0"
    } else {
        "WHERE a.StatoCommessa <> 0"
    };
    let sql = format!(
        "{} {} ORDER BY a.AnnoCom DESC, a.NumCom DESC LIMIT ?",
        ORDER_SELECT, condition
    );

    let orders = sqlx::query_as::<_, ErpOrder>(&sql)
        .bind(limit)
        .fetch_all(erp)
        .await?;

    Ok(orders)
}

pub async fn get_order(erp: &SqlitePool, order_id: i64) -> Result<Option<ErpOrder>> {
    let sql = format!("{} WHERE a.Progressivo = ?", ORDER_SELECT);

    let order = sqlx::query_as::<_, ErpOrder>(&sql)
        .bind(order_id)
        .fetch_optional(erp)
        .await?;

    Ok(order)
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

/// Articles by code, optionally matching `search` anywhere in the code
pub async fn list_articles(
    erp: &SqlitePool,
    search: Option<&str>,
    limit: i64,
) -> Result<Vec<ErpArticle>> {
    let articles = sqlx::query_as::<_, ErpArticle>(
        r#"
        SELECT CODICE, DESCRIZIONE, ARTTIPOLOGIA
        FROM ANAGRAFICAARTICOLI
        WHERE ?1 IS NULL OR CODICE LIKE ?1
        ORDER BY CODICE
        LIMIT ?2
        "#,
    )
    .bind(like_pattern(search))
    .bind(limit)
    .fetch_all(erp)
    .await?;

    Ok(articles)
}

/// Customers by name, optionally matching `search` anywhere in the name
pub async fn list_customers(
    erp: &SqlitePool,
    search: Option<&str>,
    limit: i64,
) -> Result<Vec<ErpCustomer>> {
    let customers = sqlx::query_as::<_, ErpCustomer>(
        r#"
        SELECT CODCONTO, DSCCONTO1, DSCCONTO2, PARTITAIVA, CODFISCALE,
               INDIRIZZO, LOCALITA, PROVINCIA, CAP
        FROM ANAGRAFICACF
        WHERE ?1 IS NULL OR DSCCONTO1 LIKE ?1
        ORDER BY DSCCONTO1
        LIMIT ?2
        "#,
    )
    .bind(like_pattern(search))
    .bind(limit)
    .fetch_all(erp)
    .await?;

    Ok(customers)
}

/// Minimal ERP schema with a few rows, for tests
#[cfg(test)]
pub(crate) async fn fixture_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory ERP database");

    for statement in [
        r#"CREATE TABLE ANAGRAFICACF (
            CODCONTO TEXT PRIMARY KEY, DSCCONTO1 TEXT NOT NULL, DSCCONTO2 TEXT,
            PARTITAIVA TEXT, CODFISCALE TEXT, INDIRIZZO TEXT, LOCALITA TEXT,
            PROVINCIA TEXT, CAP TEXT)"#,
        r#"CREATE TABLE AnagraficaCommesse (
            Progressivo INTEGER PRIMARY KEY, AnnoCom INTEGER NOT NULL, NumCom INTEGER NOT NULL,
            Riferimento TEXT, CliCommitt TEXT, Oggetto TEXT, DataEmissione TEXT,
            DataConsegnaContr TEXT, StatoCommessa INTEGER NOT NULL)"#,
        r#"CREATE TABLE ANAGRAFICAARTICOLI (
            CODICE TEXT PRIMARY KEY, DESCRIZIONE TEXT, ARTTIPOLOGIA TEXT)"#,
        "INSERT INTO ANAGRAFICACF (CODCONTO, DSCCONTO1, LOCALITA) VALUES ('C001', 'Elettronica Veneta', 'Padova')",
        "INSERT INTO ANAGRAFICACF (CODCONTO, DSCCONTO1, LOCALITA) VALUES ('C002', 'Automazioni Srl', 'Treviso')",
        "INSERT INTO AnagraficaCommesse VALUES (1, 2025, 10, 'PO-1', 'C001', 'Schede I/O', '2025-01-10', '2025-03-01', 0)",
        "INSERT INTO AnagraficaCommesse VALUES (2, 2025, 11, 'PO-2', 'C002', 'Alimentatori', '2025-02-01', '2025-04-01', 0)",
        "INSERT INTO AnagraficaCommesse VALUES (3, 2024, 90, NULL, 'C999', 'Prototipi', NULL, NULL, 1)",
        "INSERT INTO ANAGRAFICAARTICOLI VALUES ('PCB-100', 'Scheda controllo', 'PF')",
        "INSERT INTO ANAGRAFICAARTICOLI VALUES ('PCB-200', 'Scheda potenza', 'PF')",
        "INSERT INTO ANAGRAFICAARTICOLI VALUES ('RES-10K', 'Resistenza 10k', 'MP')",
    ] {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("Failed to build ERP fixture");
    }

    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_orders_newest_first_with_customer() {
        let erp = fixture_pool().await;
        let orders = list_orders(&erp, true, DEFAULT_LIMIT).await.unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].number, 11);
        assert_eq!(orders[0].customer_name, "Automazioni Srl");
        assert_eq!(orders[1].issued_on.as_deref(), Some("2025-01-10"));
    }

    #[tokio::test]
    async fn test_closed_orders_and_missing_customer() {
        let erp = fixture_pool().await;
        let orders = list_orders(&erp, false, DEFAULT_LIMIT).await.unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, 1);
        assert_eq!(orders[0].customer_name, "");
    }

    #[tokio::test]
    async fn test_limit_caps_rows() {
        let erp = fixture_pool().await;
        let orders = list_orders(&erp, true, 1).await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_get_order() {
        let erp = fixture_pool().await;
        let order = get_order(&erp, 1).await.unwrap().unwrap();
        assert_eq!(order.subject.as_deref(), Some("Schede I/O"));
        assert!(get_order(&erp, 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_article_search() {
        let erp = fixture_pool().await;

        let all = list_articles(&erp, None, DEFAULT_LIMIT).await.unwrap();
        assert_eq!(all.len(), 3);

        let pcbs = list_articles(&erp, Some("PCB"), DEFAULT_LIMIT).await.unwrap();
        let codes: Vec<_> = pcbs.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["PCB-100", "PCB-200"]);
    }

    #[tokio::test]
    async fn test_search_text_is_bound() {
        let erp = fixture_pool().await;
        let result = list_customers(&erp, Some("' OR 1=1 --"), DEFAULT_LIMIT)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_customer_search_ordered_by_name() {
        let erp = fixture_pool().await;
        let customers = list_customers(&erp, Some("a"), DEFAULT_LIMIT).await.unwrap();
        let names: Vec<_> = customers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Automazioni Srl", "Elettronica Veneta"]);
    }
}
