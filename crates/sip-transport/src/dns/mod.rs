//! RFC 3263 target selection: resolves a SIP URI to an ordered list of
//! transport/address/port candidates, wrapping [`hickory_resolver`] for
//! wire queries and layering in-flight lookup deduplication plus a
//! TTL-respecting cache (spec §6).

mod cache;
mod inflight;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig as HickoryConfig, ResolverOpts};
use hickory_resolver::proto::rr::rdata::NAPTR;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, trace};

use crate::endpoint::{ChannelKind, Endpoint};
use crate::error::{Error, Result};

pub use cache::ResolverCache;
pub use inflight::QueryType;

/// Static configuration for a [`Resolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Bounds the number of concurrent wire lookups in flight at once.
    pub max_concurrent_lookups: usize,
    /// Floor applied to a record's advertised TTL, so a misconfigured
    /// zone with TTL=0 can't force a lookup storm.
    pub min_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig { max_concurrent_lookups: 5, min_ttl: Duration::from_secs(5) }
    }
}

/// Resolves SIP destinations per RFC 3263: an IP-literal host bypasses
/// DNS entirely; a domain with an explicit port skips SRV and resolves
/// A/AAAA directly; otherwise NAPTR then SRV records determine the
/// transport and candidate hosts, falling back to A/AAAA with the
/// transport's default port when no NAPTR/SRV records exist.
pub struct Resolver {
    inner: TokioAsyncResolver,
    cache: ResolverCache,
    inflight_addr: inflight::InFlightRegistry<Vec<IpAddr>>,
    inflight_srv: inflight::InFlightRegistry<Vec<SrvTarget>>,
    inflight_naptr: inflight::InFlightRegistry<Option<ChannelKind>>,
    semaphore: Arc<tokio::sync::Semaphore>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let inner = TokioAsyncResolver::tokio(HickoryConfig::default(), ResolverOpts::default());
        Ok(Resolver {
            inner,
            cache: ResolverCache::new(),
            inflight_addr: inflight::InFlightRegistry::new(),
            inflight_srv: inflight::InFlightRegistry::new(),
            inflight_naptr: inflight::InFlightRegistry::new(),
            semaphore: Arc::new(tokio::sync::Semaphore::new(config.max_concurrent_lookups)),
            config,
        })
    }

    /// Resolve `host` for `kind`, consulting the cache, deduplicating
    /// with any identical lookup already in flight, and otherwise
    /// issuing the wire query (A/AAAA for now; SRV/NAPTR candidate
    /// ordering is layered on by [`Self::resolve_target`]).
    pub async fn resolve_host(&self, host: &str, kind: ChannelKind) -> Result<Vec<Endpoint>> {
        if let Ok(addr) = host.parse::<IpAddr>() {
            return Ok(vec![Endpoint::new(kind, SocketAddr::new(addr, kind.default_port()))]);
        }

        let query = QueryType::Address(host.to_string());
        if let Some(cached) = self.cache.get(&query) {
            debug!(%host, "resolver cache hit");
            return Ok(cached.into_iter().map(|addr| Endpoint::new(kind, SocketAddr::new(addr, kind.default_port()))).collect());
        }

        let addrs = self
            .inflight_addr
            .dedup(query.clone(), || self.lookup_wire(host.to_string()))
            .await?;

        self.cache.insert(query, addrs.clone(), self.config.min_ttl);
        Ok(addrs.into_iter().map(|addr| Endpoint::new(kind, SocketAddr::new(addr, kind.default_port()))).collect())
    }

    /// Full RFC 3263 §4 target selection for `host` under `scheme`,
    /// honoring an explicit `transport_param` if the URI carried one.
    /// An IP literal or an explicit port skips SRV/NAPTR entirely; a
    /// bare domain consults NAPTR, then SRV, falling back to a direct
    /// A/AAAA lookup at the transport's default port when neither
    /// yields usable records.
    pub async fn resolve_target(
        &self,
        host: &str,
        explicit_port: Option<u16>,
        scheme: &str,
        transport_param: Option<&str>,
    ) -> Result<Vec<Endpoint>> {
        let preferred = ChannelKind::select(scheme, transport_param)
            .ok_or_else(|| Error::Resolution { name: host.to_string(), message: format!("unsupported scheme/transport for {scheme}") })?;

        if let Ok(addr) = host.parse::<IpAddr>() {
            let port = explicit_port.unwrap_or(preferred.default_port());
            return Ok(vec![Endpoint::new(preferred, SocketAddr::new(addr, port))]);
        }

        if let Some(port) = explicit_port {
            let addrs = self.resolve_host(host, preferred).await?;
            return Ok(addrs.into_iter().map(|e| Endpoint::new(e.kind, SocketAddr::new(e.addr.ip(), port))).collect());
        }

        // RFC 7118 websocket transports don't carry SRV/NAPTR records;
        // go straight to A/AAAA.
        if matches!(preferred, ChannelKind::Ws | ChannelKind::Wss) {
            return self.resolve_host(host, preferred).await;
        }

        // transport_param explicit means the UAC already chose the
        // transport (spec §4.5) — skip NAPTR, SRV only for that kind.
        let candidate_kinds: Vec<ChannelKind> = if transport_param.is_some() {
            vec![preferred]
        } else if let Some(naptr_kind) = self.naptr_lookup(host).await {
            vec![naptr_kind]
        } else if preferred == ChannelKind::Tls {
            vec![ChannelKind::Tls]
        } else {
            vec![ChannelKind::Udp, ChannelKind::Tcp]
        };

        for kind in candidate_kinds {
            if let Ok(endpoints) = self.srv_resolve(host, kind).await {
                if !endpoints.is_empty() {
                    return Ok(endpoints);
                }
            }
        }

        self.resolve_host(host, preferred).await
    }

    /// Best-effort NAPTR lookup picking the lowest (order, preference)
    /// record whose service tag names a transport this stack supports.
    /// Any lookup failure or unrecognized service set is treated as "no
    /// NAPTR records", per RFC 3263 §4.1's fallback-to-SRV rule. Kept
    /// outside the in-flight/cache layer: a NAPTR answer resolves to a
    /// transport choice, not an address, so it doesn't fit the
    /// `Vec<IpAddr>` currency those share.
    async fn naptr_lookup(&self, host: &str) -> Option<ChannelKind> {
        let query = QueryType::Naptr(host.to_string());
        self.inflight_naptr
            .dedup(query, || async move {
                let raw = match self.inner.lookup(host, RecordType::NAPTR).await {
                    Ok(lookup) => lookup,
                    Err(e) => {
                        trace!(%host, error = %e, "no usable NAPTR records");
                        return Ok(None);
                    }
                };

                let mut records: Vec<NAPTR> =
                    raw.record_iter().filter_map(|r| r.data().and_then(RData::as_naptr).cloned()).collect();
                records.sort_by_key(|n| (n.order(), n.preference()));

                Ok(records.into_iter().find_map(|record| naptr_service_to_kind(record.services())))
            })
            .await
            .ok()
            .flatten()
    }

    /// Resolve `host`'s SRV records for `kind`'s service label, order
    /// them per RFC 2782, then resolve each target host to addresses.
    /// Same reasoning as [`Self::naptr_lookup`] for staying outside the
    /// `Vec<IpAddr>`-shaped in-flight/cache layer.
    async fn srv_resolve(&self, host: &str, kind: ChannelKind) -> Result<Vec<Endpoint>> {
        let label = srv_service_label(kind, host);
        let query = QueryType::Srv(label.clone());

        let raw_targets = self
            .inflight_srv
            .dedup(query, || {
                let label = label.clone();
                async move {
                    let lookup = self
                        .inner
                        .srv_lookup(&label)
                        .await
                        .map_err(|e| Error::Resolution { name: label.clone(), message: e.to_string() })?;
                    Ok(lookup
                        .iter()
                        .map(|srv| SrvTarget {
                            priority: srv.priority(),
                            weight: srv.weight(),
                            host: srv.target().to_utf8(),
                            port: srv.port(),
                        })
                        .collect::<Vec<SrvTarget>>())
                }
            })
            .await?;

        if raw_targets.is_empty() {
            return Ok(Vec::new());
        }

        let ordered = Self::order_srv_targets(raw_targets);
        let mut endpoints = Vec::new();
        for target in ordered {
            let target_host = target.host.trim_end_matches('.');
            let resolved = self.resolve_host(target_host, kind).await?;
            endpoints.extend(resolved.into_iter().map(|e| Endpoint::new(kind, SocketAddr::new(e.addr.ip(), target.port))));
        }
        Ok(endpoints)
    }

    async fn lookup_wire(&self, host: String) -> Result<Vec<IpAddr>> {
        let _permit = self.semaphore.acquire().await.map_err(|_| Error::Resolution {
            name: host.clone(),
            message: "resolver worker pool closed".to_string(),
        })?;
        let response = self.inner.lookup_ip(&host).await.map_err(|e| Error::Resolution {
            name: host.clone(),
            message: e.to_string(),
        })?;
        let addrs: Vec<IpAddr> = response.iter().collect();
        if addrs.is_empty() {
            return Err(Error::Resolution { name: host, message: "no A/AAAA records".to_string() });
        }
        Ok(addrs)
    }

    /// RFC 3263 §4.2: order SRV targets by (priority ascending, weight
    /// descending within a priority), applying RFC 2782's weighted
    /// random selection among equal-priority entries.
    pub fn order_srv_targets(mut targets: Vec<SrvTarget>) -> Vec<SrvTarget> {
        targets.sort_by_key(|t| t.priority);
        let mut ordered = Vec::with_capacity(targets.len());
        let mut i = 0;
        while i < targets.len() {
            let priority = targets[i].priority;
            let mut band: Vec<SrvTarget> = Vec::new();
            while i < targets.len() && targets[i].priority == priority {
                band.push(targets[i].clone());
                i += 1;
            }
            ordered.extend(weighted_order(band));
        }
        ordered
    }
}

/// One SRV record's target host, port, and selection weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvTarget {
    pub priority: u16,
    pub weight: u16,
    pub host: String,
    pub port: u16,
}

/// RFC 2782: within a priority band, a weight-0 entry is tried only
/// after every nonzero-weight entry, and entries are otherwise drawn
/// without replacement with probability proportional to weight.
fn weighted_order(mut band: Vec<SrvTarget>) -> Vec<SrvTarget> {
    let mut ordered = Vec::with_capacity(band.len());
    while !band.is_empty() {
        let total_weight: u32 = band.iter().map(|t| t.weight as u32).sum();
        if total_weight == 0 {
            ordered.append(&mut band);
            break;
        }
        let pick = rand::random::<u32>() % total_weight;
        let mut running = 0u32;
        let mut chosen = 0usize;
        for (idx, target) in band.iter().enumerate() {
            running += target.weight as u32;
            if pick < running {
                chosen = idx;
                break;
            }
        }
        ordered.push(band.remove(chosen));
    }
    ordered
}

/// RFC 3263 §4.1 SRV service labels for the transports it covers.
fn srv_service_label(kind: ChannelKind, host: &str) -> String {
    match kind {
        ChannelKind::Udp => format!("_sip._udp.{host}"),
        ChannelKind::Tcp => format!("_sip._tcp.{host}"),
        ChannelKind::Tls => format!("_sips._tcp.{host}"),
        ChannelKind::Ws | ChannelKind::Wss => format!("_sip._tcp.{host}"),
    }
}

/// RFC 3263 §4.1's NAPTR service tags for the transports it covers;
/// anything else is a transport this stack doesn't speak and is
/// skipped in favor of the next-best NAPTR record.
fn naptr_service_to_kind(services: &str) -> Option<ChannelKind> {
    match services.to_ascii_uppercase().as_str() {
        "SIP+D2U" => Some(ChannelKind::Udp),
        "SIP+D2T" => Some(ChannelKind::Tcp),
        "SIPS+D2T" => Some(ChannelKind::Tls),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_priority_first() {
        let targets = vec![
            SrvTarget { priority: 20, weight: 0, host: "b.example.com".into(), port: 5060 },
            SrvTarget { priority: 10, weight: 0, host: "a.example.com".into(), port: 5060 },
        ];
        let ordered = Resolver::order_srv_targets(targets);
        assert_eq!(ordered[0].host, "a.example.com");
        assert_eq!(ordered[1].host, "b.example.com");
    }

    #[test]
    fn zero_weight_entries_keep_a_stable_relative_order() {
        let targets = vec![
            SrvTarget { priority: 10, weight: 0, host: "a.example.com".into(), port: 5060 },
            SrvTarget { priority: 10, weight: 0, host: "b.example.com".into(), port: 5060 },
        ];
        let ordered = Resolver::order_srv_targets(targets);
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn srv_label_matches_rfc_3263_service_names() {
        assert_eq!(srv_service_label(ChannelKind::Udp, "biloxi.example.com"), "_sip._udp.biloxi.example.com");
        assert_eq!(srv_service_label(ChannelKind::Tcp, "biloxi.example.com"), "_sip._tcp.biloxi.example.com");
        assert_eq!(srv_service_label(ChannelKind::Tls, "biloxi.example.com"), "_sips._tcp.biloxi.example.com");
    }

    #[test]
    fn naptr_service_tags_map_to_the_transport_they_name() {
        assert_eq!(naptr_service_to_kind("SIP+D2U"), Some(ChannelKind::Udp));
        assert_eq!(naptr_service_to_kind("sip+d2t"), Some(ChannelKind::Tcp));
        assert_eq!(naptr_service_to_kind("SIPS+D2T"), Some(ChannelKind::Tls));
        assert_eq!(naptr_service_to_kind("SIP+D2W"), None);
    }
}
