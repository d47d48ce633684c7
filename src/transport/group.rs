//! In-process collective of N participants connected by channels.
//!
//! The coordinator owns the backing store; followers own only a receiving end.
//! Each participant is meant to run on its own thread and drive an identical
//! sequence of decode calls, exactly as separate processes in a distributed
//! job would.

use std::io::{Read, Seek, SeekFrom};
use std::sync::mpsc::{channel, Receiver, Sender};

use super::{read_up_to, Transport, TransportError};

enum Role<R> {
    Coordinator { store: R, followers: Vec<Sender<Vec<u8>>> },
    Follower { inbox: Receiver<Vec<u8>> },
}

/// One member of a [`LocalGroup`].
pub struct LocalParticipant<R> {
    rank:         usize,
    coordinator:  usize,
    participants: usize,
    role:         Role<R>,
}

/// Factory for a connected set of [`LocalParticipant`]s.
pub struct LocalGroup;

impl LocalGroup {
    /// Build `size` participants.  `store` is handed to the participant at
    /// rank `coordinator`; the result is indexed by rank.
    ///
    /// `size` must be at least 1 and `coordinator < size`.
    pub fn new<R: Read + Seek>(size: usize, coordinator: usize, store: R) -> Vec<LocalParticipant<R>> {
        let size = size.max(1);
        let coordinator = coordinator.min(size - 1);

        let mut senders = Vec::with_capacity(size - 1);
        let mut inboxes = Vec::with_capacity(size - 1);
        for _ in 1..size {
            let (tx, rx) = channel();
            senders.push(tx);
            inboxes.push(rx);
        }

        let mut owned = Some((store, senders));
        let mut inboxes = inboxes.into_iter();
        let mut group = Vec::with_capacity(size);
        for rank in 0..size {
            let (parts, inbox) = if rank == coordinator {
                (owned.take(), None)
            } else {
                (None, inboxes.next())
            };
            let role = match (parts, inbox) {
                (Some((store, followers)), _) => Role::Coordinator { store, followers },
                (None, Some(inbox))          => Role::Follower { inbox },
                (None, None)                 => unreachable!("one inbox per follower"),
            };
            group.push(LocalParticipant { rank, coordinator, participants: size, role });
        }
        group
    }
}

impl<R: Read + Seek> Transport for LocalParticipant<R> {
    fn rank(&self) -> usize { self.rank }
    fn coordinator(&self) -> usize { self.coordinator }
    fn participants(&self) -> usize { self.participants }

    fn seek(&mut self, position: u64) -> Result<(), TransportError> {
        match &mut self.role {
            Role::Coordinator { store, .. } => {
                store.seek(SeekFrom::Start(position))?;
                Ok(())
            }
            Role::Follower { .. } => Err(TransportError::NoBackingStore { rank: self.rank }),
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        match &mut self.role {
            Role::Coordinator { store, .. } => {
                store.read_exact(buf)?;
                Ok(())
            }
            Role::Follower { .. } => Err(TransportError::NoBackingStore { rank: self.rank }),
        }
    }

    fn read_partial(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match &mut self.role {
            Role::Coordinator { store, .. } => Ok(read_up_to(store, buf)?),
            Role::Follower { .. } => Err(TransportError::NoBackingStore { rank: self.rank }),
        }
    }

    fn broadcast(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        match &mut self.role {
            Role::Coordinator { followers, .. } => {
                for tx in followers.iter() {
                    tx.send(buf.to_vec()).map_err(|_| TransportError::Disconnected)?;
                }
                Ok(())
            }
            Role::Follower { inbox } => {
                let bytes = inbox.recv().map_err(|_| TransportError::Disconnected)?;
                if bytes.len() != buf.len() {
                    return Err(TransportError::LengthMismatch { sent: bytes.len(), expected: buf.len() });
                }
                buf.copy_from_slice(&bytes);
                Ok(())
            }
        }
    }
}
