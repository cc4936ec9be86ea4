use std::fmt::Write;

/// Directory nginx reads site definitions from.
pub const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
/// Directory of enabled site symlinks.
pub const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// A reverse-proxy site forwarding port 80 to a local upstream.
///
/// # Example
///
/// ```
/// use dockhand::NginxSite;
///
/// let site = NginxSite::new("webapp", 5000);
///
/// assert!(site.render().contains("proxy_pass http://127.0.0.1:5000;"));
/// ```
#[derive(Debug, Clone)]
pub struct NginxSite {
    pub name: String,
    pub upstream_port: u16,
    pub listen: u16,
    pub server_name: String,
}

impl NginxSite {
    #[must_use]
    pub fn new(name: &str, upstream_port: u16) -> Self {
        Self {
            name: name.to_string(),
            upstream_port,
            listen: 80,
            server_name: "_".to_string(),
        }
    }

    #[must_use]
    pub fn server_name(mut self, server_name: &str) -> Self {
        self.server_name = server_name.to_string();
        self
    }

    /// Path of the site definition.
    #[must_use]
    pub fn available_path(&self) -> String {
        format!("{SITES_AVAILABLE}/{}", self.name)
    }

    /// Path of the enabling symlink.
    #[must_use]
    pub fn enabled_path(&self) -> String {
        format!("{SITES_ENABLED}/{}", self.name)
    }

    /// Render the complete site file.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "server {{");
        let _ = writeln!(out, "    listen {};", self.listen);
        let _ = writeln!(out, "    listen [::]:{};", self.listen);
        let _ = writeln!(out, "    server_name {};", self.server_name);
        let _ = writeln!(out);
        let _ = writeln!(out, "    location / {{");
        let _ = writeln!(out, "        proxy_pass http://127.0.0.1:{};", self.upstream_port);
        let _ = writeln!(out, "        proxy_http_version 1.1;");
        let _ = writeln!(out, "        proxy_set_header Host $host;");
        let _ = writeln!(out, "        proxy_set_header X-Real-IP $remote_addr;");
        let _ = writeln!(
            out,
            "        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;"
        );
        let _ = writeln!(out, "        proxy_set_header X-Forwarded-Proto $scheme;");
        let _ = writeln!(out, "        proxy_set_header Upgrade $http_upgrade;");
        let _ = writeln!(out, "        proxy_set_header Connection \"upgrade\";");
        let _ = writeln!(out, "    }}");
        let _ = writeln!(out, "}}");
        out
    }
}
