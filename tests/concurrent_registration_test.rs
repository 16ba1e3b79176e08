// ==========================================
// 并发登记测试
// ==========================================
// 职责: 多个工作线程（各自独立连接）同时登记时的防重与库存守恒
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod concurrent_registration_test {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use paint_line_engine::config::RegistrationConfig;
    use paint_line_engine::engine::{
        BatchRegistrar, ConsumptionStrategy, RegistrationError, RegistrationOutcome,
        RegistrationRequest,
    };
    use rusqlite::params;

    use crate::test_helpers::{self, at, count_rows};

    const WORKERS: usize = 8;

    fn request(piece_id: i64, paint_id: i64, cabin_id: i64, quantity: i64) -> RegistrationRequest {
        RegistrationRequest {
            piece_id,
            paint_id,
            cabin_id,
            quantity,
            thickness_um: 50.0,
            density_g_cm3: 1.2,
            strategy: ConsumptionStrategy::Standard,
        }
    }

    /// 各线程打开自己的连接，在同一时刻起跑
    fn run_workers(
        db_path: &str,
        requests: Vec<RegistrationRequest>,
    ) -> Vec<Result<RegistrationOutcome, RegistrationError>> {
        let barrier = Arc::new(Barrier::new(requests.len()));
        let handles: Vec<_> = requests
            .into_iter()
            .map(|req| {
                let barrier = barrier.clone();
                let db_path = db_path.to_string();
                thread::spawn(move || {
                    let registrar = BatchRegistrar::new(
                        test_helpers::shared_connection(&db_path),
                        RegistrationConfig::default(),
                    );
                    barrier.wait();
                    registrar.register_at(&req, "operario", at(10, 0, 0, 0))
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn test_identical_submissions_register_once() {
        paint_line_engine::logging::init_test();
        let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
        let conn = test_helpers::open_test_connection(&db_path).unwrap();
        let line = test_helpers::seed_standard_line(&conn);

        let req = request(line.piece_id, line.paint_id, line.cabin_id, 10);
        let results = run_workers(&db_path, vec![req; WORKERS]);

        let outcomes: Vec<RegistrationOutcome> =
            results.into_iter().map(|r| r.unwrap()).collect();
        let registered: Vec<_> = outcomes.iter().filter(|o| !o.is_duplicate()).collect();
        assert_eq!(registered.len(), 1);

        let batch_id = registered[0].batch_id();
        assert!(outcomes.iter().all(|o| o.batch_id() == batch_id));

        assert_eq!(count_rows(&conn, "painted_batch"), 1);
        assert_eq!(count_rows(&conn, "usage_event"), 1);
        let painted: i64 = conn
            .query_row(
                "SELECT total_painted FROM piece WHERE piece_id = ?1",
                params![line.piece_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(painted, 10);
        assert!((test_helpers::gun_hours(&conn, line.gun_ids[0]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_competing_batches_never_oversell_stock() {
        let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
        let conn = test_helpers::open_test_connection(&db_path).unwrap();
        let line = test_helpers::seed_standard_line(&conn);
        let piece_id = test_helpers::seed_piece(&conn, 2.0, 1.0, 30);

        // 数量互不相同，不会被视为重复；总需求 5+6+...+12 = 68 > 30
        let requests: Vec<_> = (5..5 + WORKERS as i64)
            .map(|qty| request(piece_id, line.paint_id, line.cabin_id, qty))
            .collect();
        let results = run_workers(&db_path, requests);

        let mut accepted = 0;
        for result in &results {
            match result {
                Ok(outcome) => {
                    assert!(!outcome.is_duplicate());
                    if let RegistrationOutcome::Registered(summary) = outcome {
                        assert!(summary.piece_stock_remaining >= 0);
                    }
                }
                Err(err) => assert!(
                    matches!(err, RegistrationError::PreconditionFailed { .. }),
                    "{:?}",
                    err
                ),
            }
        }

        let (received, painted): (i64, i64) = conn
            .query_row(
                "SELECT total_received, total_painted FROM piece WHERE piece_id = ?1",
                params![piece_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        let batch_sum: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(quantity), 0) FROM painted_batch WHERE piece_id = ?1",
                params![piece_id],
                |row| row.get(0),
            )
            .unwrap();
        for outcome in results.iter().flatten() {
            accepted += outcome_quantity(outcome, &conn);
        }

        assert!(painted <= received);
        assert_eq!(painted, batch_sum);
        assert_eq!(painted, accepted);
        assert!(painted > 0);

        // 油漆扣减与批次耗漆一致
        let (remaining, consumed): (f64, f64) = conn
            .query_row(
                "SELECT p.remaining_kg, (SELECT SUM(consumption_kg) FROM painted_batch)
                 FROM paint p WHERE p.paint_id = ?1",
                params![line.paint_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!((remaining + consumed - 100.0).abs() < 1e-9);
    }

    fn outcome_quantity(outcome: &RegistrationOutcome, conn: &rusqlite::Connection) -> i64 {
        conn.query_row(
            "SELECT quantity FROM painted_batch WHERE batch_id = ?1",
            params![outcome.batch_id()],
            |row| row.get(0),
        )
        .unwrap()
    }
}
