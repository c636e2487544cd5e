/// Error code registry for blockflow
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Script errors
/// - 3000-3999: Iteration errors
/// - 4000-4999: Merge errors
/// - 5000-5999: Stop/error signals
/// - 6000-6999: Wait errors
/// - 9000-9999: Other errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_TOML: u16 = 1002;
    pub const CONFIG_INVALID_JSON: u16 = 1003;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_PATH_ERROR: u16 = 1006;

    // Script errors (2000-2999)
    pub const SCRIPT_GENERIC: u16 = 2000;
    pub const SCRIPT_COMPILE: u16 = 2001;
    pub const SCRIPT_RUNTIME: u16 = 2002;
    pub const SCRIPT_CONVERSION: u16 = 2003;

    // Iteration errors (3000-3999)
    pub const ITERATION_GENERIC: u16 = 3000;
    pub const ITERATION_INVALID_RANGE: u16 = 3001;
    pub const ITERATION_STATS: u16 = 3002;

    // Merge errors (4000-4999)
    pub const MERGE_GENERIC: u16 = 4000;
    pub const MERGE_UNKNOWN_MODE: u16 = 4001;
    pub const MERGE_UNKNOWN_OBJECT_STRATEGY: u16 = 4002;
    pub const MERGE_MISSING_CUSTOM_CODE: u16 = 4003;
    pub const MERGE_CUSTOM_CODE: u16 = 4004;
    pub const MERGE_TRANSFORM: u16 = 4005;
    pub const MERGE_SERIALIZATION: u16 = 4006;

    // Stop/error signals (5000-5999)
    pub const STOP_GENERIC: u16 = 5000;
    pub const STOP_WARNING: u16 = 5001;
    pub const STOP_ERROR: u16 = 5002;
    pub const STOP_FATAL: u16 = 5003;

    // Wait errors (6000-6999)
    pub const WAIT_GENERIC: u16 = 6000;
    pub const WAIT_MISSING_TARGET: u16 = 6001;
    pub const WAIT_INVALID_TARGET: u16 = 6002;
    pub const WAIT_MISSING_CONDITION: u16 = 6003;
    pub const WAIT_UNKNOWN_MODE: u16 = 6004;
    pub const WAIT_CONDITION: u16 = 6005;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_IO: u16 = 9001;
}

/// Get a human-readable description of an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid TOML in configuration file",
        1003 => "Invalid JSON document",
        1005 => "Invalid configuration value",
        1006 => "Configuration path error",

        2000 => "Generic script error",
        2001 => "Script failed to compile",
        2002 => "Script raised an error",
        2003 => "Script value could not be converted",

        3000 => "Generic iteration error",
        3001 => "Range bounds are not numbers",
        3002 => "Iteration statistics could not be serialized",

        4000 => "Generic merge error",
        4001 => "Unknown merge mode",
        4002 => "Unknown object merge strategy",
        4003 => "Custom merge code missing",
        4004 => "Custom merge code failed",
        4005 => "Merge transform failed",
        4006 => "Merge configuration could not be serialized",

        5000 => "Workflow stopped",
        5001 => "Workflow stopped with a warning",
        5002 => "Workflow stopped with an error",
        5003 => "Workflow stopped with a fatal error",

        6000 => "Generic wait error",
        6001 => "Target date missing",
        6002 => "Target date invalid",
        6003 => "Wait condition missing",
        6004 => "Unknown wait mode",
        6005 => "Wait condition failed",

        9000 => "Generic error",
        9001 => "IO operation failed",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_ranges() {
        assert!(ErrorCode::CONFIG_GENERIC >= 1000 && ErrorCode::CONFIG_GENERIC < 2000);
        assert!(ErrorCode::SCRIPT_GENERIC >= 2000 && ErrorCode::SCRIPT_GENERIC < 3000);
        assert!(ErrorCode::ITERATION_GENERIC >= 3000 && ErrorCode::ITERATION_GENERIC < 4000);
        assert!(ErrorCode::MERGE_GENERIC >= 4000 && ErrorCode::MERGE_GENERIC < 5000);
        assert!(ErrorCode::STOP_GENERIC >= 5000 && ErrorCode::STOP_GENERIC < 6000);
        assert!(ErrorCode::WAIT_GENERIC >= 6000 && ErrorCode::WAIT_GENERIC < 7000);
        assert!(ErrorCode::OTHER_GENERIC >= 9000 && ErrorCode::OTHER_GENERIC < 10000);
    }

    #[test]
    fn test_error_code_descriptions() {
        assert_eq!(describe_error_code(1001), "Configuration file not found");
        assert_eq!(describe_error_code(6004), "Unknown wait mode");
        assert_eq!(describe_error_code(65535), "Unknown error code");
    }
}
