pub const DEFAULT_CURRENCY: &str = "USD";

// Universal (analytics.js) commands.
pub const CMD_CREATE: &str = "create";
pub const CMD_SEND: &str = "send";
pub const CMD_SET: &str = "set";
pub const CMD_REQUIRE: &str = "require";
pub const CMD_LINKER_AUTO_LINK: &str = "linker:autoLink";
pub const CMD_ECOMMERCE_ADD_TRANSACTION: &str = "ecommerce:addTransaction";
pub const CMD_ECOMMERCE_ADD_ITEM: &str = "ecommerce:addItem";
pub const CMD_ECOMMERCE_SEND: &str = "ecommerce:send";
pub const CMD_ECOMMERCE_CLEAR: &str = "ecommerce:clear";
pub const CMD_EC_ADD_PRODUCT: &str = "ec:addProduct";
pub const CMD_EC_ADD_IMPRESSION: &str = "ec:addImpression";
pub const CMD_EC_ADD_PROMO: &str = "ec:addPromo";
pub const CMD_EC_SET_ACTION: &str = "ec:setAction";

// Classic (ga.js) commands.
pub const CMD_SET_ACCOUNT: &str = "_setAccount";
pub const CMD_SET_DOMAIN_NAME: &str = "_setDomainName";
pub const CMD_CLASSIC_REQUIRE: &str = "_require";
pub const CMD_CLASSIC_SET: &str = "_set";
pub const CMD_TRACK_PAGEVIEW: &str = "_trackPageview";
pub const CMD_TRACK_EVENT: &str = "_trackEvent";
pub const CMD_ADD_TRANS: &str = "_addTrans";
pub const CMD_ADD_ITEM: &str = "_addItem";
pub const CMD_TRACK_TRANS: &str = "_trackTrans";
pub const CMD_ADD_PRODUCT: &str = "_addProduct";
pub const CMD_ADD_IMPRESSION: &str = "_addImpression";
pub const CMD_ADD_PROMO: &str = "_addPromo";
pub const CMD_SET_ACTION: &str = "_setAction";

pub const INPAGE_LINKID_PLUGIN: &str = "//www.google-analytics.com/plugins/ga/inpage_linkid.js";

// Operation names reported by the e-commerce feature gate.
pub const OP_ADD_TRANS: &str = "addTrans";
pub const OP_ADD_ITEM: &str = "addItem";
pub const OP_TRACK_TRANS: &str = "trackTrans";
pub const OP_CLEAR_TRANS: &str = "clearTrans";
pub const OP_ADD_PRODUCT: &str = "addProduct";
pub const OP_ADD_IMPRESSION: &str = "addImpression";
pub const OP_ADD_PROMO: &str = "addPromo";
pub const OP_SET_ACTION: &str = "setAction";

pub const WARN_NO_ACCOUNTS: &str = "No accounts to register";
pub const WARN_MULTIPLE_CLASSIC_TRACKERS: &str =
    "Multiple trackers are not supported with ga.js. Using first tracker only";
pub const WARN_SCRIPTS_ALREADY_CREATED: &str = "Script tags already created";
pub const WARN_TRACKING_FUNCTION_MISSING: &str = "ga function not set on window";
pub const WARN_COMMAND_QUEUE_MISSING: &str = "_gaq queue not set on window";

pub const LOG_LABEL_INJECT: &str = "inject";
pub const CALL_LOG_TARGET: &str = "ga_tracker::analytics";

/// Query parameters mapped onto campaign fields of universal page views.
pub const UTM_CAMPAIGN_FIELDS: &[(&str, &str)] = &[
    ("utm_source", "campaignSource"),
    ("utm_medium", "campaignMedium"),
    ("utm_term", "campaignTerm"),
    ("utm_content", "campaignContent"),
    ("utm_campaign", "campaignName"),
];
