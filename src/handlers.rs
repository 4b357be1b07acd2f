pub mod report;
pub mod settings;
pub mod submission;

use crate::actix_web::web::Data;
use crate::database::sqlx::PgSqlxManager;

type DB = Data<PgSqlxManager>;
