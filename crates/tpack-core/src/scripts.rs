//! Install script assembly.
//!
//! Every package carries a bootstrap that creates the service account and
//! its state directories. RPM always runs the bootstrap and appends the
//! user's script; DEB uses the user's script verbatim when one is given.

/// Pre-install bootstrap: create the system user.
pub const PREINST_BOOTSTRAP: &str = r#"SYSUSER=tarantool

if ! id $SYSUSER > /dev/null 2>&1; then
    useradd -r -s /sbin/nologin -U -d /var/lib/tarantool -c "Tarantool Server" $SYSUSER
fi
"#;

/// Post-install bootstrap: state directories and service manager reload.
pub const POSTINST_BOOTSTRAP: &str = r"SYSUSER=tarantool

for dir in /var/lib/tarantool /var/log/tarantool /var/run/tarantool; do
    mkdir -p $dir
    chown $SYSUSER:$SYSUSER $dir
done

if command -v systemctl > /dev/null 2>&1; then
    systemctl daemon-reload || true
fi
";

const DEB_PREAMBLE: &str = "#!/bin/sh\nset -e\n\n";

/// Script body for RPM: bootstrap, then the user script after a newline.
pub fn rpm_script(bootstrap: &str, user: Option<&str>) -> String {
    match user {
        Some(user) => format!("{bootstrap}\n{user}"),
        None => bootstrap.to_string(),
    }
}

/// Script file for DEB: the user script verbatim, or the bootstrap with a shebang.
pub fn deb_script(bootstrap: &str, user: Option<&str>) -> String {
    match user {
        Some(user) => user.to_string(),
        None => format!("{DEB_PREAMBLE}{bootstrap}"),
    }
}
