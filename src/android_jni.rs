//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to a `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//! Data crosses the boundary as JSON strings.

use std::collections::BTreeSet;

use jni::JNIEnv;
use jni::objects::{JClass, JString};
use jni::sys::jstring;

use crate::config::NavigationConfig;
use crate::error::NavError;
use crate::model::{Position, Route};
use crate::navigator::compute_navigation_state;

/// Derive the navigation state from JSON inputs.
///
/// `position_json` may be `null` (no fix yet); an empty `config_json`
/// means defaults. Completion is taken from the route's waypoint flags.
pub fn compute_state_json(
    route_json: &str,
    position_json: &str,
    config_json: &str,
) -> Result<String, NavError> {
    let route: Route = serde_json::from_str(route_json)?;
    let position: Option<Position> = serde_json::from_str(position_json)?;
    let config = if config_json.trim().is_empty() {
        NavigationConfig::default()
    } else {
        NavigationConfig::from_json(config_json)?
    };

    let state = compute_navigation_state(position.as_ref(), &route, &BTreeSet::new(), &config);
    Ok(serde_json::to_string(&state)?)
}

fn error_json(e: &NavError) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    env.get_string(value).ok().map(Into::into)
}

fn to_jstring(env: &JNIEnv, value: &str) -> jstring {
    env.new_string(value)
        .map(|s| s.into_raw())
        .unwrap_or(std::ptr::null_mut())
}

/// Returns the library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_routeguidance_app_RustBridge_version(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    to_jstring(&env, crate::VERSION)
}

/// Routes `log` output to logcat. Safe to call more than once.
/// Maps to: RustBridge.initLogging()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_routeguidance_app_RustBridge_initLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("route-guidance"),
    );
}

/// Maps to: RustBridge.computeNavigationState(route, position, config) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_routeguidance_app_RustBridge_computeNavigationState(
    mut env: JNIEnv,
    _class: JClass,
    route_json: JString,
    position_json: JString,
    config_json: JString,
) -> jstring {
    let inputs = (
        read_string(&mut env, &route_json),
        read_string(&mut env, &position_json),
        read_string(&mut env, &config_json),
    );
    let result = match inputs {
        (Some(route), Some(position), Some(config)) => {
            compute_state_json(&route, &position, &config).unwrap_or_else(|e| error_json(&e))
        }
        _ => error_json(&NavError::Config("unreadable JNI string argument".into())),
    };
    to_jstring(&env, &result)
}

/// Maps to: RustBridge.parseGpxRoute(gpx, routeId) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_routeguidance_app_RustBridge_parseGpxRoute(
    mut env: JNIEnv,
    _class: JClass,
    gpx: JString,
    route_id: JString,
) -> jstring {
    let result = match (read_string(&mut env, &gpx), read_string(&mut env, &route_id)) {
        (Some(gpx), Some(id)) => {
            crate::gpx::parse_route_to_json(gpx.as_bytes(), &id, &NavigationConfig::default())
                .unwrap_or_else(|e| error_json(&e))
        }
        _ => error_json(&NavError::Config("unreadable JNI string argument".into())),
    };
    to_jstring(&env, &result)
}
