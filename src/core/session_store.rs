//! 会话存储抽象层
//!
//! 存储只负责 id 到会话句柄的映射；同一会话的阶段执行由句柄内的 Mutex 串行化，
//! 映射本身的锁只在查找、插入、删除时短暂持有。
//! 只读查询走 watch 快照，不等待进行中的阶段。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::core::{ResearchError, ResearchState};

/// 单个会话：执行锁下的状态、对外发布的快照与取消令牌
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub state: Arc<Mutex<ResearchState>>,
    snapshot: Arc<watch::Sender<ResearchState>>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn new(state: ResearchState) -> Self {
        let (snapshot, _) = watch::channel(state.clone());
        Self {
            state: Arc::new(Mutex::new(state)),
            snapshot: Arc::new(snapshot),
            cancel: CancellationToken::new(),
        }
    }

    /// 发布最新快照；没有订阅者时也会保留
    pub fn publish(&self, state: &ResearchState) {
        self.snapshot.send_replace(state.clone());
    }

    /// 最近一次发布的快照，不等待执行锁
    pub fn snapshot(&self) -> ResearchState {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResearchState> {
        self.snapshot.subscribe()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 插入新会话；id 已存在时返回 SessionExists
    async fn insert(&self, state: ResearchState) -> Result<SessionHandle, ResearchError>;

    async fn get(&self, session_id: &str) -> Option<SessionHandle>;

    /// 移除会话并触发其取消令牌
    async fn remove(&self, session_id: &str) -> bool;

    /// 当前所有会话 id（有序）
    async fn ids(&self) -> Vec<String>;
}

/// 进程内存会话存储
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, state: ResearchState) -> Result<SessionHandle, ResearchError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&state.session_id) {
            return Err(ResearchError::SessionExists(state.session_id));
        }
        let id = state.session_id.clone();
        let handle = SessionHandle::new(state);
        sessions.insert(id, handle.clone());
        Ok(handle)
    }

    async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn remove(&self, session_id: &str) -> bool {
        match self.sessions.write().await.remove(session_id) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
