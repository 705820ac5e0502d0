use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;
use tokio::process::Command;

#[derive(Debug, Clone, Serialize)]
pub struct VideoDevice {
    pub path: String,
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraProbe {
    pub name: String,
    pub devices: Vec<VideoDevice>,
}

/// Enumerate attached cameras, preferring `v4l2-ctl` metadata and falling
/// back to a bare /dev scan when the tool is unavailable.
pub async fn probe_cameras() -> Result<Vec<CameraProbe>> {
    match v4l2_probe().await {
        Ok(list) if !list.is_empty() => Ok(list),
        _ => scan_dev().await,
    }
}

async fn v4l2_probe() -> Result<Vec<CameraProbe>> {
    let output = Command::new("v4l2-ctl")
        .arg("--list-devices")
        .output()
        .await?;
    if !output.status.success() {
        return Ok(Vec::new());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut probes = Vec::new();
    for (name, paths) in parse_device_groups(&stdout) {
        let mut devices = Vec::new();
        for path in paths {
            let formats = probe_formats(&path).await.unwrap_or_default();
            devices.push(VideoDevice { path, formats });
        }
        probes.push(CameraProbe { name, devices });
    }
    Ok(probes)
}

/// `v4l2-ctl --list-devices` prints a device name line followed by indented
/// /dev paths, with blank lines between groups.
fn parse_device_groups(listing: &str) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut name = String::new();
    let mut paths: Vec<String> = Vec::new();

    let mut flush = |name: &mut String, paths: &mut Vec<String>| {
        if !name.is_empty() && !paths.is_empty() {
            groups.push((std::mem::take(name), std::mem::take(paths)));
        } else {
            name.clear();
            paths.clear();
        }
    };

    for raw in listing.lines() {
        let line = raw.trim_end();
        if line.is_empty() {
            flush(&mut name, &mut paths);
        } else if raw.starts_with(' ') || raw.starts_with('\t') {
            let value = line.trim();
            if value.starts_with("/dev/video") {
                paths.push(value.to_string());
            }
        } else {
            flush(&mut name, &mut paths);
            name = line.trim_end_matches(':').to_string();
        }
    }
    flush(&mut name, &mut paths);
    groups
}

async fn probe_formats(device_path: &str) -> Result<Vec<String>> {
    let output = Command::new("v4l2-ctl")
        .args(["--list-formats-ext", "-d", device_path])
        .output()
        .await?;
    if !output.status.success() {
        return Ok(Vec::new());
    }

    // format codes are printed quoted, e.g. [0]: 'MJPG' (Motion-JPEG)
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut formats = BTreeSet::new();
    for line in stdout.lines() {
        let mut quoted = line.split('\'');
        if let (Some(_), Some(code)) = (quoted.next(), quoted.next()) {
            let code = code.trim();
            if !code.is_empty() {
                formats.insert(code.to_string());
            }
        }
    }
    Ok(formats.into_iter().collect())
}

async fn scan_dev() -> Result<Vec<CameraProbe>> {
    let mut paths = Vec::new();
    let mut dir = tokio::fs::read_dir("/dev").await?;
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("video") {
            paths.push(format!("/dev/{name}"));
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Ok(Vec::new());
    }
    let devices = paths
        .into_iter()
        .map(|path| VideoDevice {
            path,
            formats: Vec::new(),
        })
        .collect();
    Ok(vec![CameraProbe {
        name: "Detected video devices".to_string(),
        devices,
    }])
}

#[cfg(test)]
mod tests {
    use super::parse_device_groups;

    #[test]
    fn parses_v4l2_device_listing() {
        let listing = "\
USB Camera (usb-0000:01:00.0-1.2):
\t/dev/video0
\t/dev/video1
\t/dev/media0

bcm2835-isp (platform:bcm2835-isp):
\t/dev/video10
";
        let groups = parse_device_groups(listing);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "USB Camera (usb-0000:01:00.0-1.2)");
        assert_eq!(groups[0].1, vec!["/dev/video0", "/dev/video1"]);
        assert_eq!(groups[1].1, vec!["/dev/video10"]);
    }

    #[test]
    fn groups_without_video_nodes_are_dropped() {
        let listing = "Some codec device:\n\t/dev/media1\n";
        assert!(parse_device_groups(listing).is_empty());
    }
}
