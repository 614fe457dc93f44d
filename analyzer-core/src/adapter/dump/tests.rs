use super::*;
use crate::model::ObjectKind;

fn parse(sql: &str) -> Result<Extraction> {
    parse_dump(&DumpSource::new(sql), &DumpConfig::default())
}

#[test]
fn test_parse_mysqldump() {
    let sql = r#"
-- MySQL dump 10.13  Distrib 8.0.36, for Linux (x86_64)
--
-- Host: localhost    Database: shop
/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;
/*!40101 SET NAMES utf8mb4 */;

CREATE DATABASE /*!32312 IF NOT EXISTS*/ `shop` /*!40100 DEFAULT CHARACTER SET utf8mb4 */;
USE `shop`;

DROP TABLE IF EXISTS `orders`;
/*!40101 SET @saved_cs_client     = @@character_set_client */;
CREATE TABLE `orders` (
  `id` bigint unsigned NOT NULL AUTO_INCREMENT,
  `user_id` int NOT NULL,
  `total` decimal(10,2) NOT NULL DEFAULT '0.00',
  `note` longtext,
  PRIMARY KEY (`id`),
  KEY `idx_user` (`user_id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci;
/*!40101 SET character_set_client = @saved_cs_client */;

LOCK TABLES `orders` WRITE;
INSERT INTO `orders` VALUES (1,1,'9.99','first; order');
UNLOCK TABLES;

--
-- Temporary view structure for view `big_orders`
--
/*!50001 CREATE VIEW `big_orders` AS SELECT
 1 AS `id`*/;

DELIMITER ;;
/*!50003 CREATE*/ /*!50017 DEFINER=`root`@`localhost`*/ /*!50003 TRIGGER `orders_bi` BEFORE INSERT ON `orders` FOR EACH ROW BEGIN
  SET NEW.total = ROUND(NEW.total, 2);
END */;;
DELIMITER ;

/*!50001 DROP VIEW IF EXISTS `big_orders`*/;
/*!50001 CREATE ALGORITHM=UNDEFINED */
/*!50013 DEFINER=`root`@`localhost` SQL SECURITY DEFINER */
/*!50001 VIEW `big_orders` AS select `orders`.`id` AS `id` from `orders` where (`orders`.`total` > 100) */;
"#;

    let extraction = parse(sql).unwrap();
    assert_eq!(extraction.dialect, SourceDialect::Mysql);
    assert_eq!(extraction.database, "shop");
    assert_eq!(extraction.skipped_statements, 0);
    assert_eq!(extraction.tables.len(), 2);

    let orders = &extraction.tables[0];
    assert_eq!(orders.name, "orders");
    assert_eq!(orders.kind, TableKind::BaseTable);
    assert_eq!(orders.row_count, 0);
    assert_eq!(orders.columns.len(), 4);
    assert_eq!(orders.engine.as_deref(), Some("InnoDB"));
    assert!(orders.has_primary_index());
    assert_eq!(orders.indexes[1].name, "idx_user");

    let view = &extraction.tables[1];
    assert_eq!(view.name, "big_orders");
    assert_eq!(view.kind, TableKind::View);

    assert_eq!(extraction.objects.len(), 1);
    assert_eq!(extraction.objects[0].kind, ObjectKind::Trigger);
    assert_eq!(extraction.objects[0].name, "orders_bi");
    assert_eq!(extraction.objects[0].table.as_deref(), Some("orders"));
}

#[test]
fn test_parse_pg_dump() {
    let sql = r#"
--
-- PostgreSQL database dump
--

SET statement_timeout = 0;
SELECT pg_catalog.set_config('search_path', '', false);

CREATE EXTENSION IF NOT EXISTS citext WITH SCHEMA public;

CREATE TYPE public.order_status AS ENUM (
    'pending',
    'shipped'
);

CREATE FUNCTION public.touch() RETURNS trigger
    LANGUAGE plpgsql
    AS $$
BEGIN
  NEW.updated_at = now();
  RETURN NEW;
END;
$$;

CREATE TABLE public.users (
    id integer NOT NULL,
    email public.citext NOT NULL,
    status public.order_status DEFAULT 'pending'::public.order_status,
    updated_at timestamp with time zone
);

CREATE SEQUENCE public.users_id_seq
    AS integer
    START WITH 1
    INCREMENT BY 1;

ALTER SEQUENCE public.users_id_seq OWNED BY public.users.id;
ALTER TABLE ONLY public.users ALTER COLUMN id SET DEFAULT nextval('public.users_id_seq'::regclass);

COPY public.users (id, email, status, updated_at) FROM stdin;
1	a@example.com	pending	\N
\.

ALTER TABLE ONLY public.users
    ADD CONSTRAINT users_pkey PRIMARY KEY (id);

CREATE UNIQUE INDEX users_email_key ON public.users USING btree (email);

COMMENT ON TABLE public.users IS 'Registered users';

CREATE TRIGGER users_touch BEFORE UPDATE ON public.users FOR EACH ROW EXECUTE FUNCTION public.touch();
"#;

    let extraction = parse(sql).unwrap();
    assert_eq!(extraction.dialect, SourceDialect::Postgres);
    assert_eq!(extraction.database, "uploaded_schema");
    assert_eq!(extraction.skipped_statements, 0);
    assert_eq!(extraction.tables.len(), 1);

    let users = &extraction.tables[0];
    assert_eq!(users.name, "users");
    assert_eq!(users.comment.as_deref(), Some("Registered users"));
    assert!(users.columns[0].auto_increment);
    assert!(
        users.columns[0]
            .default_value
            .as_deref()
            .is_some_and(|d| d.starts_with("nextval"))
    );
    assert_eq!(users.indexes.len(), 2);
    assert!(users.indexes[0].primary);
    assert!(users.indexes[1].unique);

    let kinds: Vec<_> = extraction.objects.iter().map(|o| o.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ObjectKind::Extension,
            ObjectKind::Type,
            ObjectKind::Function,
            ObjectKind::Sequence,
            ObjectKind::Trigger
        ]
    );
}

#[test]
fn test_parse_mssql_script() {
    let sql = r#"
USE [Inventory]
GO
SET ANSI_NULLS ON
GO
SET QUOTED_IDENTIFIER ON
GO
CREATE TABLE [dbo].[Products](
	[ProductID] [int] IDENTITY(1,1) NOT NULL,
	[Name] [nvarchar](max) NOT NULL,
	[Price] [money] NULL,
 CONSTRAINT [PK_Products] PRIMARY KEY CLUSTERED
(
	[ProductID] ASC
)WITH (PAD_INDEX = OFF, STATISTICS_NORECOMPUTE = OFF, IGNORE_DUP_KEY = OFF) ON [PRIMARY]
) ON [PRIMARY] TEXTIMAGE_ON [PRIMARY]
GO
ALTER TABLE [dbo].[Products] ADD  CONSTRAINT [DF_Products_Price]  DEFAULT ((0)) FOR [Price]
GO
CREATE PROCEDURE [dbo].[GetProducts]
AS
BEGIN
	SET NOCOUNT ON;
	SELECT * FROM [dbo].[Products];
END
GO
"#;

    let extraction = parse(sql).unwrap();
    assert_eq!(extraction.dialect, SourceDialect::Mssql);
    assert_eq!(extraction.database, "Inventory");
    assert_eq!(extraction.skipped_statements, 0);

    let products = &extraction.tables[0];
    assert_eq!(products.name, "Products");
    assert!(products.columns[0].auto_increment);
    assert_eq!(products.columns[2].default_value.as_deref(), Some("((0))"));
    assert_eq!(products.indexes[0].name, "PK_Products");

    assert_eq!(extraction.objects.len(), 1);
    assert_eq!(extraction.objects[0].kind, ObjectKind::Procedure);
    assert_eq!(extraction.objects[0].name, "GetProducts");
}

#[test]
fn test_partial_extraction_counts_skipped_statements() {
    let sql = r#"
CREATE TABLE a (id INT PRIMARY KEY);
CREATE TABLE b (id INT PRIMARY KEY);
CREATE TABLE broken (id INT,, name;
CREATE TABLE c (id INT PRIMARY KEY);
"#;

    let extraction = parse(sql).unwrap();
    assert_eq!(extraction.tables.len(), 3);
    assert_eq!(extraction.skipped_statements, 1);
}

#[test]
fn test_only_malformed_statements_is_parse_error() {
    let err = parse("CREATE TABLE broken (id INT,, name;\nNOT EVEN SQL;").unwrap_err();
    assert!(matches!(err, AnalyzerError::Parse(_)));
    assert!(err.to_string().contains("2 statements skipped"));
}

#[test]
fn test_empty_dump_is_valid() {
    let extraction = parse("-- nothing here\nSET NAMES utf8mb4;\n").unwrap();
    assert!(extraction.tables.is_empty());
    assert_eq!(extraction.skipped_statements, 0);
}

#[test]
fn test_zero_column_table_fails_the_parse() {
    let source = DumpSource::new("CREATE TABLE t ();").with_dialect(SourceDialect::Postgres);
    let err = parse_dump(&source, &DumpConfig::default()).unwrap_err();
    assert!(err.to_string().contains("has no columns"));
}

#[test]
fn test_file_name_must_end_with_sql() {
    let source = DumpSource::new("CREATE TABLE t (id INT);").with_file_name("schema.txt");
    let err = parse_dump(&source, &DumpConfig::default()).unwrap_err();
    assert!(matches!(err, AnalyzerError::Unsupported(_)));

    let source = DumpSource::new("CREATE TABLE t (id INT);").with_file_name("Schema.SQL");
    assert!(parse_dump(&source, &DumpConfig::default()).is_ok());
}

#[test]
fn test_configured_dialect_and_database_name() {
    let config = DumpConfig {
        default_dialect: Some(SourceDialect::Mariadb),
        database_name: "legacy".to_string(),
    };
    let extraction = parse_dump(&DumpSource::new("CREATE TABLE t (id INT);"), &config).unwrap();
    assert_eq!(extraction.dialect, SourceDialect::Mariadb);
    assert_eq!(extraction.database, "legacy");
}

#[test]
fn test_index_on_unknown_table_is_skipped() {
    let sql = "CREATE TABLE t (id INT);\nCREATE INDEX idx ON missing (id);";
    let extraction = parse(sql).unwrap();
    assert_eq!(extraction.skipped_statements, 1);
    assert!(extraction.tables[0].indexes.is_empty());
}

#[test]
fn test_index_on_unknown_column_is_skipped() {
    let sql = "CREATE TABLE a (id INT PRIMARY KEY);\n\
               CREATE TABLE b (id INT PRIMARY KEY);\n\
               CREATE INDEX idx_x ON b (nope);\n\
               ALTER TABLE a ADD UNIQUE KEY uq_missing (missing);";
    let extraction = parse(sql).unwrap();
    assert_eq!(extraction.tables.len(), 2);
    assert_eq!(extraction.skipped_statements, 2);
    assert!(extraction.tables.iter().all(|t| t.indexes.len() == 1));

    let model = crate::model::build_model(extraction).unwrap();
    assert_eq!(model.base_table_count(), 2);
}

#[test]
fn test_invalid_inline_constraint_is_dropped() {
    let sql = "CREATE TABLE t (id INT, name VARCHAR(20), PRIMARY KEY (id), UNIQUE KEY uq_ghost (ghost));\n\
               CREATE TABLE u (id INT PRIMARY KEY, PRIMARY KEY (id));";
    let extraction = parse(sql).unwrap();
    assert_eq!(extraction.tables.len(), 2);
    assert_eq!(extraction.skipped_statements, 2);

    let t = &extraction.tables[0];
    assert_eq!(t.indexes.len(), 1);
    assert!(t.indexes[0].primary);
    let u = &extraction.tables[1];
    assert_eq!(u.indexes.iter().filter(|i| i.primary).count(), 1);

    assert!(crate::model::build_model(extraction).is_ok());
}

#[test]
fn test_postgres_folds_unquoted_identifiers() {
    let sql = r#"
CREATE TABLE Users (Id INT, Email TEXT, CONSTRAINT Users_PK PRIMARY KEY (id));
CREATE INDEX users_email_idx ON USERS (EMAIL);
COMMENT ON COLUMN Users.Email IS 'login';
CREATE TABLE "Mixed" ("Name" text, "ID" int, CONSTRAINT "Mixed_PK" PRIMARY KEY ("ID"));
"#;
    let source = DumpSource::new(sql).with_dialect(SourceDialect::Postgres);
    let extraction = parse_dump(&source, &DumpConfig::default()).unwrap();
    assert_eq!(extraction.skipped_statements, 0);

    let users = &extraction.tables[0];
    assert_eq!(users.name, "users");
    let names: Vec<_> = users.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "email"]);
    assert_eq!(users.indexes[0].name, "users_pk");
    assert_eq!(users.indexes[0].columns, vec!["id"]);
    assert_eq!(users.indexes[1].columns, vec!["email"]);
    assert_eq!(users.columns[1].comment.as_deref(), Some("login"));

    let mixed = &extraction.tables[1];
    assert_eq!(mixed.name, "Mixed");
    assert_eq!(mixed.columns[0].name, "Name");
    assert_eq!(mixed.indexes[0].name, "Mixed_PK");
    assert_eq!(mixed.indexes[0].columns, vec!["ID"]);

    let model = crate::model::build_model(extraction).unwrap();
    assert!(model.tables.iter().all(|t| t.has_primary_key));
}
