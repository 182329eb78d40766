pub mod csv_tasks;
pub mod plain_text;
