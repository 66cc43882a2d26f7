use actix_web::web::{self};

pub mod ports;

pub mod routes {
    pub mod admin;
    pub mod currency;
    pub mod plan;
    pub mod sub;
}

pub mod services {
    pub mod currency;
    pub mod plan;
    pub mod sub;
}

pub mod models {
    pub mod plan;
    pub mod sub;
}

pub mod store {
    pub mod memory;
    pub mod pg;
}

mod dtos {
    pub(crate) mod currency;
    pub(crate) mod plan;
    pub(crate) mod sub;
}

/// Public catalogue, mounted outside the secured scope.
pub fn mount_plans() -> actix_web::Scope {
    web::scope("/plans")
        .service(routes::plan::get_plans)
        .service(routes::plan::get_plan)
}

pub fn mount_currencies() -> actix_web::Scope {
    web::scope("/currencies").service(routes::currency::get_currencies)
}

pub fn mount_subs() -> actix_web::Scope {
    web::scope("/subscriptions")
        .service(routes::sub::get_subscriptions)
        .service(routes::sub::post_subscription)
        .service(routes::sub::get_active_subscription)
        .service(routes::sub::get_subscription)
        .service(routes::sub::put_cancel)
        .service(routes::sub::put_plan)
        .service(routes::sub::put_payment_method)
        .service(routes::sub::put_renew)
}

pub fn mount_admin() -> actix_web::Scope {
    web::scope("/admin")
        .service(routes::admin::get_subscriptions)
        .service(routes::admin::get_expiring)
        .service(routes::admin::get_pending_renewals)
        .service(routes::admin::put_status)
        .service(routes::admin::delete_subscription)
        .service(routes::admin::get_plans)
        .service(routes::admin::get_active_plans)
        .service(routes::admin::post_plan)
        .service(routes::admin::put_plan)
        .service(routes::admin::delete_plan)
        .service(routes::admin::post_currency)
        .service(routes::admin::put_currency)
}
