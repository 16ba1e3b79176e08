// ==========================================
// 喷涂线引擎 - 演示数据库重置与种子数据
// ==========================================
// 用法: seed_demo_line [DB_PATH]
// 说明: 已存在的库先备份为 <path>.bak.<时间戳> 再删除
// ==========================================

use chrono::Local;
use rusqlite::{params, Connection};
use std::error::Error;
use std::fs;
use std::path::Path;

use paint_line_engine::app::get_default_db_path;
use paint_line_engine::db::{ensure_schema, open_sqlite_connection, DATE_FORMAT};

struct CabinSeed {
    name: &'static str,
    max_daily_pieces: i64,
    guns: &'static [(&'static str, f64, f64)], // (名称, 已用小时, 维护周期)
    ovens: &'static [(&'static str, f64, f64, f64, f64)], // (名称, 已用小时, 维护周期, 最高温度, 燃气/小时)
}

const CABINS: &[CabinSeed] = &[
    CabinSeed {
        name: "Cabina Norte",
        max_daily_pieces: 120,
        guns: &[("Pistola N1", 10.0, 200.0), ("Pistola N2", 150.0, 200.0)],
        ovens: &[("Horno N", 380.0, 500.0, 220.0, 3.5)],
    },
    CabinSeed {
        name: "Cabina Sur",
        max_daily_pieces: 80,
        guns: &[("Pistola S1", 185.0, 200.0)],
        ovens: &[("Horno S", 495.0, 500.0, 200.0, 2.8)],
    },
];

const PIECES: &[(i64, &str, f64, f64, i64)] = &[
    (1, "Puerta corredera", 2.0, 1.0, 200),
    (1, "Panel lateral", 1.2, 0.8, 150),
    (2, "Reja de ventana", 1.0, 1.5, 60),
];

const PAINTS: &[(&str, &str, &str, f64)] = &[
    ("Akzo", "RAL 9010", "Poliéster", 25.0),
    ("Tiger", "RAL 7016", "Epoxi", 12.5),
];

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;
    seed_demo_line(&conn)?;
    print_quick_counts(&conn)?;

    eprintln!("Seeded demo line into {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_demo_line(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let today = Local::now().date_naive().format(DATE_FORMAT).to_string();
    let tx = conn.unchecked_transaction()?;

    for cabin in CABINS {
        tx.execute(
            "INSERT INTO cabin (name, status, max_daily_pieces) VALUES (?1, 'ACTIVE', ?2)",
            params![cabin.name, cabin.max_daily_pieces],
        )?;
        let cabin_id = tx.last_insert_rowid();

        for (name, usage, interval) in cabin.guns {
            tx.execute(
                "INSERT INTO gun (name, usage_hours, maintenance_interval_hours, last_maintenance_date)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, usage, interval, today],
            )?;
            tx.execute(
                "INSERT INTO cabin_gun (cabin_id, gun_id) VALUES (?1, ?2)",
                params![cabin_id, tx.last_insert_rowid()],
            )?;
        }

        for (name, usage, interval, max_temp, gas) in cabin.ovens {
            tx.execute(
                "INSERT INTO oven (name, usage_hours, maintenance_interval_hours,
                                   last_maintenance_date, max_temperature_c, gas_per_hour)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![name, usage, interval, today, max_temp, gas],
            )?;
            tx.execute(
                "INSERT INTO cabin_oven (cabin_id, oven_id) VALUES (?1, ?2)",
                params![cabin_id, tx.last_insert_rowid()],
            )?;
        }
    }

    for (client_id, description, width, height, received) in PIECES {
        tx.execute(
            "INSERT INTO piece (client_id, description, width_m, height_m, total_received)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![client_id, description, width, height, received],
        )?;
    }

    for (brand, color, paint_type, kg) in PAINTS {
        tx.execute(
            "INSERT INTO paint (brand, color, paint_type, remaining_kg) VALUES (?1, ?2, ?3, ?4)",
            params![brand, color, paint_type, kg],
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn print_quick_counts(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let tables = [
        "cabin", "gun", "oven", "cabin_gun", "cabin_oven", "piece", "paint",
    ];

    eprintln!("Row counts:");
    for t in tables {
        let sql = format!("SELECT COUNT(*) FROM {}", t);
        let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        eprintln!("  {:<12} {}", t, n);
    }
    Ok(())
}
