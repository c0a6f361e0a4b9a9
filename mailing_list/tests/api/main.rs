mod configured_defaults;
mod helpers;
