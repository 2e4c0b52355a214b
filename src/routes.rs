use crate::{
    api::{adjustment, export, punch, report},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let punch_limiter = build_limiter(config.rate_punch_per_min);
    let adjustment_limiter = build_limiter(config.rate_adjustment_per_min);
    let report_limiter = build_limiter(config.rate_report_per_min);
    let export_limiter = build_limiter(config.rate_export_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/punch")
                    .wrap(punch_limiter)
                    // /punch
                    .service(
                        web::resource("")
                            .route(web::post().to(punch::submit_punch))
                            .route(web::get().to(punch::punch_list)),
                    )
                    // /punch/{id}/verify
                    .service(
                        web::resource("/{id}/verify")
                            .route(web::get().to(punch::verify_punch)),
                    ),
            )
            .service(
                web::scope("/adjustment")
                    .wrap(adjustment_limiter)
                    // /adjustment
                    .service(
                        web::resource("")
                            .route(web::get().to(adjustment::adjustment_list))
                            .route(web::post().to(adjustment::create_adjustment)),
                    )
                    // /adjustment/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(adjustment::get_adjustment)),
                    )
                    // /adjustment/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(adjustment::approve_adjustment)),
                    )
                    // /adjustment/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(adjustment::reject_adjustment)),
                    ),
            )
            .service(
                web::scope("/report")
                    .wrap(report_limiter)
                    // /report/daily
                    .service(
                        web::resource("/daily").route(web::get().to(report::daily_report)),
                    )
                    // /report/weekly
                    .service(
                        web::resource("/weekly").route(web::get().to(report::weekly_report)),
                    )
                    // /report/period
                    .service(
                        web::resource("/period").route(web::get().to(report::period_report)),
                    ),
            )
            .service(
                web::scope("/export")
                    .wrap(export_limiter)
                    // /export/compliance
                    .service(
                        web::resource("/compliance")
                            .route(web::get().to(export::compliance_export)),
                    )
                    // /export/compliance/verify
                    .service(
                        web::resource("/compliance/verify")
                            .route(web::get().to(export::compliance_export_verify)),
                    ),
            ),
    );
}

// PUNCH
//  ├─ fingerprint + cool-down guard
//  └─ append-only ledger row

// CORRECTION
//  └─ adjustment (pending)
//       ├─ approve => materialized row chained to the original
//       └─ reject  => original untouched, reason recorded

// REPORTING
//  └─ ledger -> daily -> weekly -> period -> hour bank / export
